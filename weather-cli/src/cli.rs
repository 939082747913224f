use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{debug, warn};
use weather_core::{
    Config, Coordinates, FileStore, GeolocationMode, SearchOutcome, WeatherApp,
    geolocation::locator_from_config,
    provider::{Disconnected, WeatherProvider, provider_from_config},
    render,
};

use crate::{interactive, output};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather lookup")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print without colours.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Without a command, shows the last saved state.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and geolocation preferences.
    Configure {
        /// Set the key without prompting.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Look up weather by city name. Without a name, repeats the last search.
    Show {
        /// City name, e.g. "Kyiv" or "New York".
        city: Vec<String>,
    },

    /// Look up weather for the current position.
    Locate {
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Repeat the previous coordinate lookup.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        last: bool,
    },

    /// List recent searches.
    History,

    /// Search again for a history entry, by number (1 = newest) or name.
    Pick { entry: String },

    /// Set the search text without searching.
    City { text: Vec<String> },

    /// Switch between light and dark theme.
    Theme,

    /// Prompt-driven session.
    Interactive,
}

impl Command {
    fn needs_network(&self) -> bool {
        matches!(
            self,
            Command::Show { .. } | Command::Locate { .. } | Command::Pick { .. }
        )
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        let provider = provider_for(self.command.as_ref(), &config)?;
        let mut app = build_app(&config, provider)?;
        let color = !self.no_color;

        match self.command {
            None | Some(Command::History) => {}
            Some(Command::Configure { api_key }) => return configure(&mut config, api_key),
            Some(Command::Show { city }) => {
                if !city.is_empty() {
                    app.set_city_text(city.join(" "));
                }
                if app.search_by_name().await == SearchOutcome::Skipped {
                    bail!("Nothing to search for.\nHint: run `weather show <city>`.");
                }
            }
            Some(Command::Locate { lat, lon, last }) => {
                let position = match (lat, lon) {
                    (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
                    _ if last => Some(app.last_coordinates().context(
                        "No previous coordinate lookup.\nHint: run `weather locate` first.",
                    )?),
                    _ => None,
                };
                match position {
                    Some(position) => app.search_by_coordinates(position).await,
                    None => app.locate_and_search().await,
                };
            }
            Some(Command::Pick { entry }) => {
                let outcome = match entry.parse::<usize>() {
                    Ok(number) if number >= 1 => app.select_history_index(number - 1).await,
                    _ if app.history().iter().any(|name| name == entry) => {
                        Some(app.select_history(&entry).await)
                    }
                    _ => None,
                };
                if outcome.is_none() {
                    bail!(
                        "No history entry '{entry}'.\nHint: run `weather history` to list entries."
                    );
                }
            }
            Some(Command::City { text }) => app.set_city_text(text.join(" ")),
            Some(Command::Theme) => {
                app.toggle_theme();
            }
            Some(Command::Interactive) => {
                return interactive::run(&mut app, &config, color).await;
            }
        }

        let view = render::render(&app, &config.icon_base_url);
        output::print_view(&view, color)
    }
}

/// Picks the provider for `command`.
///
/// Search commands require an API key. Interactive mode starts without one
/// so local actions stay usable; its searches then fail with a request error.
fn provider_for(
    command: Option<&Command>,
    config: &Config,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    match command {
        Some(command) if command.needs_network() => provider_from_config(config),
        Some(Command::Interactive) => match provider_from_config(config) {
            Ok(provider) => Ok(provider),
            Err(err) => {
                warn!(error = %err, "starting interactive mode offline");
                eprintln!("{err:#}\nSearches are unavailable until an API key is configured.");
                Ok(Arc::new(Disconnected))
            }
        },
        _ => Ok(Arc::new(Disconnected)),
    }
}

/// Restores the app from the configured state file.
pub fn build_app(
    config: &Config,
    provider: Arc<dyn WeatherProvider>,
) -> anyhow::Result<WeatherApp> {
    let path = config.storage_file_path()?;
    debug!(path = %path.display(), "opening state file");
    let store = FileStore::open(path)?;

    Ok(WeatherApp::restore(Box::new(store), provider).with_locator(locator_from_config(config)))
}

fn configure(config: &mut Config, api_key: Option<String>) -> anyhow::Result<()> {
    let api_key = match api_key {
        Some(key) => key,
        None => inquire::Password::new("OpenWeather API key:")
            .without_confirmation()
            .with_display_mode(inquire::PasswordDisplayMode::Masked)
            .prompt()?,
    };
    if api_key.trim().is_empty() {
        bail!("API key must not be empty.");
    }
    config.set_api_key(api_key);

    let modes = [GeolocationMode::Ip, GeolocationMode::Fixed, GeolocationMode::Off];
    let labels: Vec<&str> = modes.iter().map(|mode| mode_label(*mode)).collect();
    let start = modes
        .iter()
        .position(|mode| *mode == config.geolocation)
        .unwrap_or(0);
    let chosen = inquire::Select::new("Geolocation source:", labels.clone())
        .with_starting_cursor(start)
        .prompt()?;
    config.geolocation = modes[labels.iter().position(|l| *l == chosen).unwrap_or(0)];

    if config.geolocation == GeolocationMode::Fixed {
        let lat = inquire::CustomType::<f64>::new("Latitude:").prompt()?;
        let lon = inquire::CustomType::<f64>::new("Longitude:").prompt()?;
        config.fixed_location = Some(Coordinates { lat, lon });
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn mode_label(mode: GeolocationMode) -> &'static str {
    match mode {
        GeolocationMode::Ip => "Approximate from IP address",
        GeolocationMode::Fixed => "Fixed coordinates",
        GeolocationMode::Off => "Disabled",
    }
}
