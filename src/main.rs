//! `sitekeeper` command-line entry point.
//!
//! Every run opens the database (PostgreSQL with SQLite failover), syncs the schema,
//! seeds the admin account, runs one command and closes the backend again.

mod commands;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use sitekeeper::ConnectionManager;
use sitekeeper::config::{AppConfig, DEFAULT_ENV_FILE, env_file_arg};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn load_env_files() {
    let explicit = env_file_arg(std::env::args_os());
    let primary = explicit
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_FILE).to_path_buf());
    if let Err(e) = dotenvy::from_path(&primary) {
        if explicit.is_some() {
            eprintln!("warning: could not load {}: {e}", primary.display());
        }
    }
    // Missing `.env` is normal.
    let _ = dotenvy::dotenv();
}

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.log_json {
        subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env_files();
    let config = AppConfig::parse();
    init_tracing(&config);

    info!("Starting sitekeeper v{}", env!("CARGO_PKG_VERSION"));

    let manager = match ConnectionManager::initialize(&config.database()).await {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "failed to initialize database");
            return ExitCode::FAILURE;
        }
    };

    let outcome = commands::run(&config, &manager).await;

    if let Err(e) = manager.close().await {
        warn!(error = %e, "error while closing database");
    }

    match outcome {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "failed to render output");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, status = e.status_code(), "command failed");
            ExitCode::FAILURE
        }
    }
}
