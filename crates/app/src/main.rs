use std::process::ExitCode;

use clap::Parser;
use migration::{Migrator, MigratorTrait};

use crate::{cli::Cli, error::Result, settings::Settings};

mod cli;
mod commands;
mod error;
mod output;
mod settings;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), cli.database_url.clone())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "divvy={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let database = connect_database(&settings.database.url).await?;
    let engine = engine::Engine::builder().database(database).build().await?;

    let output = commands::run(&engine, &settings, cli.command).await?;
    output.write(cli.format, &mut std::io::stdout().lock())
}

async fn connect_database(url: &str) -> Result<sea_orm::DatabaseConnection> {
    tracing::debug!("connecting to {url}");
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
