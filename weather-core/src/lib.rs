//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and the provider abstraction over it
//! - Search state: city text, theme, history, current reading
//! - Persistent key/value storage for that state
//! - Geolocation lookup and a pure renderer for the view
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod app;
pub mod config;
pub mod geolocation;
pub mod history;
pub mod model;
pub mod preferences;
pub mod provider;
pub mod render;
pub mod storage;

pub use app::{SearchOutcome, SearchTicket, WeatherApp};
pub use config::{Config, GeolocationMode};
pub use geolocation::{GeoError, Locator, PositionOptions};
pub use history::History;
pub use model::{Coordinates, WeatherReading};
pub use preferences::{Preferences, Theme};
pub use provider::{WeatherProvider, WeatherQuery};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageKey};
