//! Timepiece RS job runner
//!
//! Runs the scheduled jobs (billing window extension, weekly allocation)
//! and prints commitment, overtime and summary reports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tp_core::clock::SystemClock;
use tp_core::config::{AppConfig, LoggingConfig};
use tp_db::{Database, PgStore};
use tp_services::Services;

mod commands;

use commands::Command;

#[derive(Parser)]
#[command(name = "timepiece", version, about = "Time ledger and contract allocation jobs", long_about = None)]
struct Cli {
    /// Settings file (TOML, YAML or JSON); environment variables otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Create missing tables before running
    #[arg(long, global = true)]
    apply_schema: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppConfig::from_env().context("loading settings from the environment")?,
    };
    init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), command = cli.command.name(), "Starting timepiece");

    let db = Database::connect(&config.database)
        .await
        .context("connecting to the database")?;
    db.ping().await.context("database is not reachable")?;
    if cli.apply_schema {
        db.apply_schema().await.context("applying the schema")?;
        info!("Schema applied");
    }

    let store = Arc::new(PgStore::from_database(&db));
    let services = Services::new(store, Arc::new(SystemClock), &config);

    let result = cli.command.run(&services).await;
    db.close().await;
    result
}

/// `RUST_LOG` wins over the configured filter
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}
