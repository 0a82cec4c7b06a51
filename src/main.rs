mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, DEFAULT_DATABASE_URL};
use std::env;
use struct2db::connection::config::DATABASE_URL_VAR;
use struct2db::{Controller, DatabaseConfig, DatabaseUrl};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = DatabaseConfig::from_env()?;
    if let Some(url) = &cli.database_url {
        config.database_url = DatabaseUrl::parse(url)?;
    } else if env::var(DATABASE_URL_VAR).is_err() {
        config.database_url = DatabaseUrl::parse(DEFAULT_DATABASE_URL)?;
    }
    if let Some(prefix) = &cli.table_prefix {
        config = config.table_prefix(prefix);
    }

    let controller = Controller::connect(&config)
        .await
        .with_context(|| format!("failed to open {}", config.to_url()))?;
    cli::commands::run(&controller, cli.command).await
}
