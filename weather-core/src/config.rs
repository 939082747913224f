use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::model::Coordinates;

/// Environment variable that overrides the API key stored on disk.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Where geolocation requests get their position from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationMode {
    /// Ask an IP geolocation service.
    #[default]
    Ip,
    /// Use `fixed_location` from the config.
    Fixed,
    /// Geolocation is unavailable.
    Off,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// geolocation = "fixed"
///
/// [fixed_location]
/// lat = 50.45
/// lon = 30.52
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenWeather API key; `OPENWEATHER_API_KEY` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_icon_base_url")]
    pub icon_base_url: String,

    #[serde(default = "default_units")]
    pub units: String,

    #[serde(default = "default_lang")]
    pub lang: String,

    /// Per-request timeout. Unset means requests wait as long as the
    /// server takes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub geolocation: GeolocationMode,

    #[serde(default = "default_ip_locator_url")]
    pub ip_locator_url: String,

    /// Overrides the platform data directory location of `state.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    /// Position used when `geolocation = "fixed"`. Kept last so it
    /// serializes as a trailing TOML table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_location: Option<Coordinates>,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_icon_base_url() -> String {
    "https://openweathermap.org/img/wn".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_ip_locator_url() -> String {
    "http://ip-api.com/json/?fields=status,message,lat,lon".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            icon_base_url: default_icon_base_url(),
            units: default_units(),
            lang: default_lang(),
            request_timeout_secs: None,
            geolocation: GeolocationMode::default(),
            ip_locator_url: default_ip_locator_url(),
            storage_path: None,
            fixed_location: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key from the environment, falling back to the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key_with_override(std::env::var(API_KEY_ENV).ok())
    }

    pub fn api_key_with_override(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    /// Where persistent state lives.
    pub fn storage_file_path(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => crate::storage::FileStore::default_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_openweather() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(cfg.units, "metric");
        assert_eq!(cfg.lang, "en");
        assert_eq!(cfg.geolocation, GeolocationMode::Ip);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn environment_key_wins_over_file_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("  FILE_KEY ".into());

        assert_eq!(cfg.api_key.as_deref(), Some("FILE_KEY"));
        assert_eq!(
            cfg.api_key_with_override(Some("ENV_KEY".into())).as_deref(),
            Some("ENV_KEY")
        );
        assert_eq!(
            cfg.api_key_with_override(Some("   ".into())).as_deref(),
            Some("FILE_KEY")
        );
        assert_eq!(cfg.api_key_with_override(None).as_deref(), Some("FILE_KEY"));
    }

    #[test]
    fn blank_keys_are_treated_as_missing() {
        let cfg = Config {
            api_key: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(cfg.api_key_with_override(None), None);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            api_key = "KEY"
            geolocation = "fixed"

            [fixed_location]
            lat = 50.45
            lon = 30.52
            "#,
        )
        .expect("config should parse");

        assert_eq!(cfg.api_key.as_deref(), Some("KEY"));
        assert_eq!(cfg.geolocation, GeolocationMode::Fixed);
        assert_eq!(cfg.fixed_location, Some(Coordinates { lat: 50.45, lon: 30.52 }));
        assert_eq!(cfg.icon_base_url, "https://openweathermap.org/img/wn");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.geolocation = GeolocationMode::Off;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("KEY"));
        assert_eq!(loaded.geolocation, GeolocationMode::Off);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.api_key.is_none());
    }
}
