//! One-shot position lookup.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::{Config, GeolocationMode},
    model::Coordinates,
};

/// Shown when no locator is available at all.
pub const UNSUPPORTED_MESSAGE: &str = "Geolocation is not supported on this system";

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Upper bound on how long the lookup may take.
    pub timeout: Duration,
    /// How old a previously obtained position may be and still be reused.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("position request timed out")]
    Timeout,

    #[error("geolocation failed with code {code}: {message}")]
    Other { code: u16, message: String },
}

impl GeoError {
    /// Numeric code: 1 denied, 2 unavailable, 3 timeout.
    pub fn code(&self) -> u16 {
        match self {
            GeoError::PermissionDenied(_) => 1,
            GeoError::PositionUnavailable(_) => 2,
            GeoError::Timeout => 3,
            GeoError::Other { code, .. } => *code,
        }
    }

    pub fn user_message(&self) -> &'static str {
        message_for_code(self.code())
    }
}

/// Maps a geolocation error code to the text shown to the user.
pub fn message_for_code(code: u16) -> &'static str {
    match code {
        1 => "Access to geolocation denied",
        2 => "Unable to determine position",
        3 => "Geolocation request timed out",
        _ => "Geolocation error",
    }
}

#[async_trait]
pub trait Locator: Send + Sync + Debug {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinates, GeoError>;
}

/// Always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator {
    position: Coordinates,
}

impl FixedLocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Locator for FixedLocator {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Coordinates, GeoError> {
        Ok(self.position)
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Approximates the position from the public IP address.
#[derive(Debug)]
pub struct IpLocator {
    url: String,
    http: Client,
    last_fix: Mutex<Option<(Instant, Coordinates)>>,
}

impl IpLocator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Coordinates> {
        let guard = self.last_fix.lock().ok()?;
        let (at, position) = (*guard)?;
        (at.elapsed() < maximum_age).then_some(position)
    }

    fn remember(&self, position: Coordinates) {
        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some((Instant::now(), position));
        }
    }

    async fn lookup(&self) -> Result<Coordinates, GeoError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|err| GeoError::PositionUnavailable(err.to_string()))?;

        let status = res.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(GeoError::PermissionDenied(format!(
                "IP geolocation service refused the request ({status})"
            )));
        }
        if !status.is_success() {
            return Err(GeoError::PositionUnavailable(format!(
                "IP geolocation service returned {status}"
            )));
        }

        let parsed: IpApiResponse = res
            .json()
            .await
            .map_err(|err| GeoError::PositionUnavailable(err.to_string()))?;

        match parsed {
            IpApiResponse {
                status,
                lat: Some(lat),
                lon: Some(lon),
                ..
            } if status == "success" => Ok(Coordinates { lat, lon }),
            IpApiResponse { message, .. } => Err(GeoError::PositionUnavailable(
                message.unwrap_or_else(|| "no position in response".to_string()),
            )),
        }
    }
}

#[async_trait]
impl Locator for IpLocator {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinates, GeoError> {
        if let Some(position) = self.cached(options.maximum_age) {
            debug!("reusing cached IP position");
            return Ok(position);
        }

        if options.enable_high_accuracy {
            debug!("IP lookup cannot honour high accuracy; using best effort");
        }

        let position = tokio::time::timeout(options.timeout, self.lookup())
            .await
            .map_err(|_| GeoError::Timeout)??;

        self.remember(position);
        Ok(position)
    }
}

/// Builds the locator selected in config; `None` means geolocation is
/// unavailable.
pub fn locator_from_config(config: &Config) -> Option<Arc<dyn Locator>> {
    match config.geolocation {
        GeolocationMode::Ip => Some(Arc::new(IpLocator::new(config.ip_locator_url.clone()))),
        GeolocationMode::Fixed => match config.fixed_location {
            Some(position) => Some(Arc::new(FixedLocator::new(position))),
            None => {
                warn!("geolocation = \"fixed\" but no fixed_location is configured");
                None
            }
        },
        GeolocationMode::Off => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_widget_settings() {
        let options = PositionOptions::default();
        assert!(options.enable_high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.maximum_age, Duration::from_secs(600));
    }

    #[test]
    fn known_codes_have_dedicated_messages() {
        assert_eq!(message_for_code(1), "Access to geolocation denied");
        assert_eq!(message_for_code(2), "Unable to determine position");
        assert_eq!(message_for_code(3), "Geolocation request timed out");
        assert_eq!(message_for_code(0), "Geolocation error");
        assert_eq!(message_for_code(42), "Geolocation error");
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(GeoError::PermissionDenied(String::new()).code(), 1);
        assert_eq!(GeoError::PositionUnavailable(String::new()).code(), 2);
        assert_eq!(GeoError::Timeout.code(), 3);
        let other = GeoError::Other { code: 7, message: "boom".into() };
        assert_eq!(other.user_message(), "Geolocation error");
    }

    #[tokio::test]
    async fn fixed_locator_returns_its_position() {
        let position = Coordinates { lat: 1.0, lon: 2.0 };
        let locator = FixedLocator::new(position);
        let got = locator
            .current_position(&PositionOptions::default())
            .await
            .unwrap();
        assert_eq!(got, position);
    }

    #[test]
    fn locator_selection_follows_config() {
        let mut cfg = Config {
            geolocation: GeolocationMode::Off,
            ..Config::default()
        };
        assert!(locator_from_config(&cfg).is_none());

        cfg.geolocation = GeolocationMode::Fixed;
        assert!(locator_from_config(&cfg).is_none());

        cfg.fixed_location = Some(Coordinates { lat: 1.0, lon: 2.0 });
        assert!(locator_from_config(&cfg).is_some());

        cfg.geolocation = GeolocationMode::Ip;
        assert!(locator_from_config(&cfg).is_some());
    }

    #[test]
    fn cache_respects_maximum_age() {
        let locator = IpLocator::new("http://127.0.0.1:9/unused");
        assert_eq!(locator.cached(Duration::from_secs(600)), None);

        let position = Coordinates { lat: 3.0, lon: 4.0 };
        locator.remember(position);
        assert_eq!(locator.cached(Duration::from_secs(600)), Some(position));
        assert_eq!(locator.cached(Duration::ZERO), None);
    }
}
