//! Prompt-driven session mirroring the search box, buttons and history list.

use inquire::{InquireError, Select, Text};
use std::fmt;
use weather_core::{Config, WeatherApp, render};

use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Find,
    Refresh,
    SwitchTheme,
    MyLocation,
    Recent,
    Quit,
}

impl Action {
    const ALL: [Action; 6] = [
        Action::Find,
        Action::Refresh,
        Action::SwitchTheme,
        Action::MyLocation,
        Action::Recent,
        Action::Quit,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Find => "Find city",
            Action::Refresh => "Refresh",
            Action::SwitchTheme => "Switch theme",
            Action::MyLocation => "📍 My location",
            Action::Recent => "Recent searches",
            Action::Quit => "Quit",
        })
    }
}

/// Treats Esc / Ctrl-C as "leave this prompt".
fn cancelled<T>(result: Result<T, InquireError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn run(app: &mut WeatherApp, config: &Config, color: bool) -> anyhow::Result<()> {
    loop {
        output::print_view(&render::render(app, &config.icon_base_url), color)?;
        println!();

        let Some(action) = cancelled(Select::new("What next?", Action::ALL.to_vec()).prompt())?
        else {
            return Ok(());
        };

        match action {
            Action::Find => {
                let prompt = Text::new("City:")
                    .with_initial_value(app.city())
                    .with_placeholder("Enter city...")
                    .prompt();
                if let Some(city) = cancelled(prompt)? {
                    app.set_city_text(city);
                    app.search_by_name().await;
                }
            }
            Action::Refresh => {
                app.search_by_name().await;
            }
            Action::SwitchTheme => {
                app.toggle_theme();
            }
            Action::MyLocation => {
                app.locate_and_search().await;
            }
            Action::Recent => {
                let names: Vec<String> = app.history().iter().map(str::to_owned).collect();
                if names.is_empty() {
                    println!("No recent searches yet.");
                    continue;
                }
                if let Some(name) = cancelled(Select::new("Recent searches:", names).prompt())? {
                    app.select_history(&name).await;
                }
            }
            Action::Quit => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_a_label() {
        let labels: Vec<String> = Action::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(labels.len(), 6);
        assert!(labels.iter().all(|label| !label.is_empty()));
        assert_eq!(Action::ALL.last(), Some(&Action::Quit));
    }

    #[test]
    fn cancellation_is_not_an_error() {
        let result: Result<String, InquireError> = Err(InquireError::OperationCanceled);
        assert!(matches!(cancelled(result), Ok(None)));

        let result: Result<String, InquireError> = Err(InquireError::OperationInterrupted);
        assert!(matches!(cancelled(result), Ok(None)));

        assert!(matches!(cancelled(Ok::<_, InquireError>(3)), Ok(Some(3))));
    }
}
