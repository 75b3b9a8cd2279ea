//! Settings for the `divvy` binary.
//!
//! Sources, later ones winning: the TOML file (`config/divvy.toml` unless
//! `--config` says otherwise, optional), `DIVVY__*` environment variables,
//! then command-line flags.

use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/divvy.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub recurring: Recurring,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    /// Log level for the `divvy` and `engine` targets.
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite:./divvy.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Recurring {
    /// Default horizon of `recurring upcoming`.
    pub horizon_days: u32,
}

impl Default for Recurring {
    fn default() -> Self {
        Self { horizon_days: 30 }
    }
}

impl Settings {
    pub fn load(config_path: Option<&str>, database_url: Option<String>) -> Result<Self> {
        let config_path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::File::with_name(config_path).required(false));
        builder = builder.add_source(
            config::Environment::with_prefix("DIVVY")
                .separator("__")
                .try_parsing(true),
        );
        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(url) = database_url {
            settings.database.url = url;
        }

        Ok(settings)
    }
}
