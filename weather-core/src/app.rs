//! Search state and the transitions that drive it.
//!
//! [`WeatherApp`] owns everything the view is derived from: the search box
//! text, theme, history, the current reading, error text and the loading
//! flag. Every mutation of a persisted field is mirrored to the
//! [`KeyValueStore`] immediately.
//!
//! Searches are split into `begin_*` and [`WeatherApp::complete`] so that a
//! driver may have several requests in flight. Each request carries the
//! generation it was started in; only the most recent one is applied.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    geolocation::{Locator, PositionOptions, UNSUPPORTED_MESSAGE},
    history::History,
    model::{Coordinates, WeatherReading, api_message, api_status_ok},
    preferences::{Preferences, Theme},
    provider::{ApiReply, FetchError, WeatherProvider, WeatherQuery},
    storage::{KeyValueStore, StorageKey, get_json, set_json},
};

/// Shown when the API answers with something that is not displayable.
pub const UNEXPECTED_RESPONSE: &str = "Unexpected API response";
/// Shown when a city search fails below the API level.
pub const SEARCH_FAILED: &str = "Something went wrong";
/// Shown when a coordinate search gets a non-success status.
pub const COORDINATE_FETCH_FAILED: &str = "Failed to fetch weather";
/// Shown when a coordinate search fails without an error message.
pub const REQUEST_ERROR: &str = "Request error";

/// Handle for a started request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTicket {
    generation: u64,
    query: WeatherQuery,
}

impl SearchTicket {
    pub fn query(&self) -> &WeatherQuery {
        &self.query
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Nothing to search for; state untouched.
    Skipped,
    /// A newer search was started before this one finished.
    Stale,
    Failed,
    Succeeded,
}

#[derive(Debug)]
pub struct WeatherApp {
    store: Box<dyn KeyValueStore>,
    provider: Arc<dyn WeatherProvider>,
    locator: Option<Arc<dyn Locator>>,
    position_options: PositionOptions,
    prefs: Preferences,
    history: History,
    weather: Option<WeatherReading>,
    error: Option<String>,
    loading: bool,
    generation: u64,
}

impl WeatherApp {
    /// Builds the initial state from whatever `store` holds.
    ///
    /// Unreadable values fall back to defaults. A stored reading that fails
    /// shape validation is also removed from the store.
    pub fn restore(mut store: Box<dyn KeyValueStore>, provider: Arc<dyn WeatherProvider>) -> Self {
        let city = store.get(StorageKey::City).unwrap_or_default();

        let theme = store
            .get(StorageKey::Theme)
            .and_then(|raw| raw.parse::<Theme>().ok())
            .unwrap_or_default();

        let history = get_json::<Vec<String>>(store.as_ref(), StorageKey::History)
            .map(History::from_entries)
            .unwrap_or_default();

        let weather = match store.get(StorageKey::Weather) {
            Some(raw) => {
                let reading = serde_json::from_str::<Value>(&raw)
                    .ok()
                    .and_then(|value| WeatherReading::try_from(value).ok());
                if reading.is_none() {
                    debug!("evicting stored weather that failed validation");
                    if let Err(err) = store.remove(StorageKey::Weather) {
                        warn!(error = %err, "failed to evict stored weather");
                    }
                }
                reading
            }
            None => None,
        };

        Self {
            store,
            provider,
            locator: None,
            position_options: PositionOptions::default(),
            prefs: Preferences { theme, city },
            history,
            weather,
            error: None,
            loading: false,
            generation: 0,
        }
    }

    pub fn with_locator(mut self, locator: Option<Arc<dyn Locator>>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.position_options = options;
        self
    }

    pub fn city(&self) -> &str {
        &self.prefs.city
    }

    pub fn theme(&self) -> Theme {
        self.prefs.theme
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn weather(&self) -> Option<&WeatherReading> {
        self.weather.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Shared handle to the provider, for drivers that fetch outside `&mut self`.
    pub fn provider(&self) -> Arc<dyn WeatherProvider> {
        Arc::clone(&self.provider)
    }

    /// Coordinates of the last coordinate search that got a response.
    pub fn last_coordinates(&self) -> Option<Coordinates> {
        get_json(self.store.as_ref(), StorageKey::LastCoords)
    }

    /// Replaces the search box text and persists it as-is.
    pub fn set_city_text(&mut self, text: impl Into<String>) {
        self.prefs.city = text.into();
        let city = self.prefs.city.clone();
        self.persist(StorageKey::City, &city);
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.prefs.theme = self.prefs.theme.toggled();
        self.persist(StorageKey::Theme, self.prefs.theme.as_str());
        self.prefs.theme
    }

    /// Starts a search for the current city text. Returns `None` without
    /// touching any state when the trimmed text is empty.
    pub fn begin_name_search(&mut self) -> Option<SearchTicket> {
        let city = self.prefs.city.trim();
        if city.is_empty() {
            return None;
        }
        let query = WeatherQuery::City(city.to_owned());
        Some(self.begin(query))
    }

    pub fn begin_coordinate_search(&mut self, position: Coordinates) -> SearchTicket {
        self.begin(WeatherQuery::Coordinates(position))
    }

    fn begin(&mut self, query: WeatherQuery) -> SearchTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.weather = None;
        debug!(generation = self.generation, ?query, "search started");

        SearchTicket {
            generation: self.generation,
            query,
        }
    }

    /// Applies the result of a started request.
    pub fn complete(
        &mut self,
        ticket: SearchTicket,
        result: Result<ApiReply, FetchError>,
    ) -> SearchOutcome {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping stale response"
            );
            return SearchOutcome::Stale;
        }

        self.loading = false;
        match ticket.query {
            WeatherQuery::City(_) => self.apply_city_reply(result),
            WeatherQuery::Coordinates(position) => self.apply_coordinate_reply(position, result),
        }
    }

    fn apply_city_reply(&mut self, result: Result<ApiReply, FetchError>) -> SearchOutcome {
        let body = match result.and_then(|reply| reply.json()) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "city search failed");
                return self.fail(SEARCH_FAILED);
            }
        };

        let message = api_message(&body).map(str::to_owned);
        if !api_status_ok(&body) {
            return self.fail(message.as_deref().unwrap_or(UNEXPECTED_RESPONSE));
        }

        let reading = match WeatherReading::try_from(body) {
            Ok(reading) => reading,
            Err(err) => {
                warn!(error = %err, "rejecting city search payload");
                return self.fail(message.as_deref().unwrap_or(UNEXPECTED_RESPONSE));
            }
        };

        let name = reading.name().to_owned();
        info!(city = %name, "weather updated");

        self.history.record(&name);
        let history = self.history.clone();
        self.persist_json(StorageKey::History, &history);
        self.persist_json(StorageKey::Weather, &reading);
        self.prefs.city = name.clone();
        self.persist(StorageKey::City, &name);
        self.weather = Some(reading);

        SearchOutcome::Succeeded
    }

    fn apply_coordinate_reply(
        &mut self,
        position: Coordinates,
        result: Result<ApiReply, FetchError>,
    ) -> SearchOutcome {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "coordinate search failed");
                return self.fail(&message_or(&err, REQUEST_ERROR));
            }
        };

        if !reply.is_success() {
            debug!(status = reply.status, "coordinate search rejected");
            return self.fail(COORDINATE_FETCH_FAILED);
        }

        let body = match reply.json() {
            Ok(body) => body,
            Err(err) => return self.fail(&message_or(&err, REQUEST_ERROR)),
        };

        self.persist_json(StorageKey::LastCoords, &position);

        match WeatherReading::try_from(body) {
            Ok(reading) => {
                info!(%position, city = reading.name(), "weather updated");
                self.weather = Some(reading);
                SearchOutcome::Succeeded
            }
            Err(err) => {
                warn!(error = %err, "rejecting coordinate search payload");
                self.fail(UNEXPECTED_RESPONSE)
            }
        }
    }

    fn fail(&mut self, message: &str) -> SearchOutcome {
        self.error = Some(message.to_owned());
        self.weather = None;
        SearchOutcome::Failed
    }

    /// Searches for the current city text.
    pub async fn search_by_name(&mut self) -> SearchOutcome {
        let Some(ticket) = self.begin_name_search() else {
            return SearchOutcome::Skipped;
        };
        self.run(ticket).await
    }

    pub async fn search_by_coordinates(&mut self, position: Coordinates) -> SearchOutcome {
        let ticket = self.begin_coordinate_search(position);
        self.run(ticket).await
    }

    /// Puts `name` in the search box and searches for exactly that name.
    pub async fn select_history(&mut self, name: &str) -> SearchOutcome {
        self.set_city_text(name);

        let city = name.trim();
        if city.is_empty() {
            return SearchOutcome::Skipped;
        }
        let ticket = self.begin(WeatherQuery::City(city.to_owned()));
        self.run(ticket).await
    }

    /// Like [`select_history`](Self::select_history), by position in the
    /// list. `None` if there is no such entry.
    pub async fn select_history_index(&mut self, index: usize) -> Option<SearchOutcome> {
        let name = self.history.get(index)?.to_owned();
        Some(self.select_history(&name).await)
    }

    /// Asks the locator for the current position and searches there.
    /// Geolocation failures only set the error text.
    pub async fn locate_and_search(&mut self) -> SearchOutcome {
        let Some(locator) = self.locator.clone() else {
            self.error = Some(UNSUPPORTED_MESSAGE.to_owned());
            return SearchOutcome::Failed;
        };

        match locator.current_position(&self.position_options).await {
            Ok(position) => self.search_by_coordinates(position).await,
            Err(err) => {
                warn!(code = err.code(), error = %err, "geolocation failed");
                self.error = Some(err.user_message().to_owned());
                SearchOutcome::Failed
            }
        }
    }

    async fn run(&mut self, ticket: SearchTicket) -> SearchOutcome {
        let provider = self.provider();
        let result = provider.fetch(ticket.query()).await;
        self.complete(ticket, result)
    }

    fn persist(&mut self, key: StorageKey, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            warn!(%key, error = %err, "failed to persist value");
        }
    }

    fn persist_json<T: Serialize + ?Sized>(&mut self, key: StorageKey, value: &T) {
        if let Err(err) = set_json(self.store.as_mut(), key, value) {
            warn!(%key, error = %err, "failed to persist value");
        }
    }
}

fn message_or(err: &FetchError, fallback: &str) -> String {
    let message = err.to_string();
    if message.is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}
