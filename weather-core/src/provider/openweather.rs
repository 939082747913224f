use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::{
    Config,
    model::Coordinates,
    provider::{ApiReply, FetchError, WeatherQuery},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: String,
    lang: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, config: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            units: config.units.clone(),
            lang: config.lang.clone(),
            http,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/weather", self.base_url)
    }

    fn location_params(query: &WeatherQuery) -> Vec<(&'static str, String)> {
        match query {
            WeatherQuery::City(city) => vec![("q", city.clone())],
            WeatherQuery::Coordinates(Coordinates { lat, lon }) => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, query: &WeatherQuery) -> Result<ApiReply, FetchError> {
        let mut params = Self::location_params(query);
        params.push(("appid", self.api_key.clone()));
        params.push(("units", self.units.clone()));
        params.push(("lang", self.lang.clone()));

        let res = self
            .http
            .get(self.endpoint())
            .query(&params)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.without_url().to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|err| FetchError::Transport(err.without_url().to_string()))?;

        if status.is_success() {
            debug!(%status, "OpenWeather request succeeded");
        } else {
            debug!(%status, body = %truncate_body(&body), "OpenWeather request failed");
        }

        Ok(ApiReply {
            status: status.as_u16(),
            body,
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "й".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let cfg = Config {
            base_url: "http://localhost:9000/data/2.5/".to_string(),
            ..Config::default()
        };
        let provider = OpenWeatherProvider::new("KEY".into(), &cfg).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:9000/data/2.5/weather");
    }

    #[test]
    fn coordinate_params_use_lat_lon() {
        let params = OpenWeatherProvider::location_params(&WeatherQuery::Coordinates(
            Coordinates { lat: 50.45, lon: 30.52 },
        ));
        assert_eq!(
            params,
            vec![("lat", "50.45".to_string()), ("lon", "30.52".to_string())]
        );
    }
}
