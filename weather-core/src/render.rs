//! Turns [`WeatherApp`] state into a styled, line-oriented view.
//!
//! Rendering is a pure function of the state; the caller decides how to paint
//! each [`Tone`] for the current [`Theme`].

use chrono::{Local, TimeZone};
use std::fmt::Display;

use crate::{app::WeatherApp, model::WeatherReading, preferences::Theme};

/// Semantic role of a line; mapped to colours by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Title,
    Hint,
    Heading,
    Item,
    Error,
    Status,
    Headline,
    Temperature,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub tone: Tone,
    pub text: String,
}

impl Line {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub theme: Theme,
    pub lines: Vec<Line>,
}

impl View {
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.text.contains(needle))
    }
}

/// Renders the whole view using local time for sunrise/sunset.
pub fn render(app: &WeatherApp, icon_base_url: &str) -> View {
    render_in(app, icon_base_url, &Local)
}

/// Like [`render`], with an explicit time zone.
pub fn render_in<Tz>(app: &WeatherApp, icon_base_url: &str, tz: &Tz) -> View
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![
        Line::new(Tone::Title, "🌤️ Weather App"),
        Line::new(
            Tone::Hint,
            format!("City: {}  ·  Theme: {}", display_city(app.city()), app.theme()),
        ),
    ];

    if !app.history().is_empty() {
        lines.push(Line::new(Tone::Heading, "Recent searches:"));
        for (index, name) in app.history().iter().enumerate() {
            lines.push(Line::new(Tone::Item, format!("  {}. {name}", index + 1)));
        }
    }

    if let Some(error) = app.error() {
        lines.push(Line::new(Tone::Error, error));
    }

    if app.is_loading() {
        lines.push(Line::new(Tone::Status, "Loading..."));
    }

    if let Some(reading) = app.weather() {
        lines.extend(card(reading, icon_base_url, tz));
    }

    View {
        theme: app.theme(),
        lines,
    }
}

fn display_city(city: &str) -> &str {
    if city.is_empty() { "-" } else { city }
}

fn card<Tz>(reading: &WeatherReading, icon_base_url: &str, tz: &Tz) -> Vec<Line>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let place = match reading.country() {
        Some(country) => format!("{}, {country}", reading.name()),
        None => reading.name().to_string(),
    };

    let icon = reading
        .icon()
        .map(|code| icon_url(icon_base_url, code))
        .unwrap_or_else(|| "-".to_string());

    let coordinates = reading
        .coordinates()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());

    vec![
        Line::new(Tone::Headline, place),
        Line::new(Tone::Detail, format!("Icon: {icon}")),
        Line::new(
            Tone::Temperature,
            format!("{}°C", rounded(reading.temperature())),
        ),
        Line::new(
            Tone::Detail,
            format!("Feels like: {}°C", rounded(reading.feels_like())),
        ),
        Line::new(
            Tone::Detail,
            reading.description().unwrap_or("-").to_string(),
        ),
        Line::new(
            Tone::Detail,
            format!(
                "🌡️ Min: {}°C | Max: {}°C",
                rounded(reading.temp_min()),
                rounded(reading.temp_max())
            ),
        ),
        Line::new(
            Tone::Detail,
            format!("💧 Humidity: {}%", number(reading.humidity())),
        ),
        Line::new(
            Tone::Detail,
            format!("📊 Pressure: {} hPa", number(reading.pressure())),
        ),
        Line::new(
            Tone::Detail,
            format!(
                "🌬️ Wind: {} m/s ({}°)",
                number(reading.wind_speed()),
                number(reading.wind_direction())
            ),
        ),
        Line::new(
            Tone::Detail,
            format!("☁️ Clouds: {}%", number(reading.cloud_cover())),
        ),
        Line::new(
            Tone::Detail,
            format!(
                "🌫️ Visibility: {} km",
                number(reading.visibility().map(|metres| metres / 1000.0))
            ),
        ),
        Line::new(Tone::Detail, format!("📍 Coords: {coordinates}")),
        Line::new(
            Tone::Detail,
            format!("🌅 Sunrise: {}", clock(reading.sunrise(), tz)),
        ),
        Line::new(
            Tone::Detail,
            format!("🌇 Sunset: {}", clock(reading.sunset(), tz)),
        ),
    ]
}

/// URL of the 2x icon for an OpenWeather icon code.
pub fn icon_url(base: &str, code: &str) -> String {
    format!("{}/{code}@2x.png", base.trim_end_matches('/'))
}

/// Rounds half-way values towards positive infinity.
///
/// Adding 0.5 before flooring is off by one just below a half
/// (`0.49999999999999994 + 0.5 == 1.0`), so the fraction is compared instead.
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}

fn rounded(value: Option<f64>) -> String {
    value
        .map(|v| round_half_up(v).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn number(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Formats epoch seconds as a wall-clock time in `tz`.
pub fn clock<Tz>(epoch_secs: Option<i64>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    epoch_secs
        .and_then(|secs| tz.timestamp_opt(secs, 0).single())
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        provider::{ApiReply, FetchError, WeatherProvider, WeatherQuery},
        storage::{KeyValueStore, MemoryStore, StorageKey},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Offline;

    #[async_trait]
    impl WeatherProvider for Offline {
        async fn fetch(&self, _: &WeatherQuery) -> Result<ApiReply, FetchError> {
            Err(FetchError::Transport("offline".into()))
        }
    }

    const ICONS: &str = "https://openweathermap.org/img/wn";

    fn app_with(store: MemoryStore) -> WeatherApp {
        WeatherApp::restore(Box::new(store), Arc::new(Offline))
    }

    fn stored_reading() -> MemoryStore {
        let mut store = MemoryStore::new();
        let payload = json!({
            "cod": 200,
            "name": "Kyiv",
            "coord": { "lat": 50.45, "lon": 30.52 },
            "sys": { "country": "UA", "sunrise": 1_700_000_000, "sunset": 1_700_030_000 },
            "main": { "temp": 3.5, "feels_like": -0.5, "temp_min": 2.4, "temp_max": 4.6,
                      "humidity": 81, "pressure": 1012 },
            "weather": [{ "icon": "04d", "description": "overcast clouds" }],
            "wind": { "speed": 4.1, "deg": 250 },
            "clouds": { "all": 100 },
            "visibility": 8500
        });
        store.set(StorageKey::Weather, &payload.to_string()).unwrap();
        store.set(StorageKey::History, r#"["Kyiv","Lviv"]"#).unwrap();
        store.set(StorageKey::City, "Kyiv").unwrap();
        store
    }

    #[test]
    fn renders_full_card() {
        let app = app_with(stored_reading());
        let view = render_in(&app, ICONS, &Utc);

        assert_eq!(view.theme, Theme::Light);
        assert!(view.contains("Kyiv, UA"));
        assert!(view.contains("https://openweathermap.org/img/wn/04d@2x.png"));
        assert!(view.lines.iter().any(|l| l.tone == Tone::Temperature && l.text == "4°C"));
        assert!(view.contains("Feels like: 0°C"));
        assert!(view.contains("Min: 2°C | Max: 5°C"));
        assert!(view.contains("Humidity: 81%"));
        assert!(view.contains("Pressure: 1012 hPa"));
        assert!(view.contains("Wind: 4.1 m/s (250°)"));
        assert!(view.contains("Clouds: 100%"));
        assert!(view.contains("Visibility: 8.5 km"));
        assert!(view.contains("Coords: [50.45, 30.52]"));
        assert!(view.contains("Sunrise: 22:13:20"));
        assert!(view.contains("Sunset: 06:33:20"));
    }

    #[test]
    fn renders_history_in_order() {
        let app = app_with(stored_reading());
        let view = render_in(&app, ICONS, &Utc);

        let items: Vec<_> = view
            .lines
            .iter()
            .filter(|l| l.tone == Tone::Item)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(items, ["  1. Kyiv", "  2. Lviv"]);
    }

    #[test]
    fn empty_state_has_no_card_or_history() {
        let app = app_with(MemoryStore::new());
        let view = render_in(&app, ICONS, &Utc);

        assert!(view.contains("City: -"));
        assert!(!view.contains("Recent searches:"));
        assert!(!view.lines.iter().any(|l| l.tone == Tone::Headline));
        assert!(!view.contains("Loading..."));
    }

    #[tokio::test]
    async fn error_is_rendered_without_card() {
        let mut app = app_with(stored_reading());
        app.search_by_name().await;
        let view = render_in(&app, ICONS, &Utc);

        assert!(view.lines.iter().any(|l| l.tone == Tone::Error));
        assert!(!view.contains("Kyiv, UA"));
    }

    #[test]
    fn loading_flag_is_rendered() {
        let mut app = app_with(MemoryStore::new());
        app.set_city_text("Kyiv");
        let _ticket = app.begin_name_search();
        let view = render_in(&app, ICONS, &Utc);
        assert!(view.contains("Loading..."));
    }

    #[test]
    fn dark_theme_is_carried_into_view() {
        let mut app = app_with(MemoryStore::new());
        app.toggle_theme();
        assert_eq!(render_in(&app, ICONS, &Utc).theme, Theme::Dark);
    }

    #[test]
    fn rounding_matches_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
        assert_eq!(round_half_up(0.49), 0);
        assert_eq!(round_half_up(0.499_999_999_999_999_94), 0);
        assert_eq!(round_half_up(-0.5), 0);
        assert_eq!(round_half_up(7.0), 7);
    }

    #[test]
    fn icon_url_tolerates_trailing_slash() {
        assert_eq!(icon_url("http://x/img/", "01n"), "http://x/img/01n@2x.png");
    }

    #[test]
    fn clock_handles_missing_values() {
        assert_eq!(clock(None, &Utc), "-");
        assert_eq!(clock(Some(0), &Utc), "00:00:00");
    }
}
