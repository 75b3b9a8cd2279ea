//! Stand-alone migration runner.
//!
//! `migration [up|down|fresh|status] [CONFIG]` reads `database.url` the same
//! way the `divvy` binary does: the TOML file (`config/divvy.toml` by
//! default, optional), then `DIVVY__DATABASE__URL`.

use sea_orm::Database;
use sea_orm_migration::prelude::*;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/divvy.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite:./divvy.db?mode=rwc";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    database: DatabaseSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DatabaseSettings {
    url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

fn database_url(config_path: &str) -> Result<String, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(config_path).required(false))
        .add_source(
            config::Environment::with_prefix("DIVVY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    Ok(settings.database.url)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let db_url = database_url(&config_path)?;
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, None).await?,
        "down" => migration::Migrator::down(&db, None).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => {
            eprintln!("Usage: cargo run -p migration -- [up|down|fresh|status] [CONFIG]");
            std::process::exit(2);
        }
    }

    Ok(())
}
