use crate::{Config, model::Coordinates, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod openweather;

/// What a lookup is keyed by.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    /// Already-trimmed city name.
    City(String),
    Coordinates(Coordinates),
}

/// Failures below the level of an API response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Decode(String),
}

/// Status line and raw body of a weather API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, FetchError> {
        serde_json::from_str(&self.body).map_err(|err| FetchError::Decode(err.to_string()))
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Issues a single current-conditions request. Any HTTP status is a
    /// successful fetch; interpreting it is up to the caller.
    async fn fetch(&self, query: &WeatherQuery) -> Result<ApiReply, FetchError>;
}

/// Stand-in for sessions that only read or edit local state; every request
/// fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl WeatherProvider for Disconnected {
    async fn fetch(&self, _query: &WeatherQuery) -> Result<ApiReply, FetchError> {
        Err(FetchError::Transport(
            "no weather provider configured for this session".to_string(),
        ))
    }
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.resolved_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `weather configure` or set OPENWEATHER_API_KEY."
        )
    })?;

    let provider = OpenWeatherProvider::new(api_key, config)?;
    Ok(Arc::new(provider))
}
