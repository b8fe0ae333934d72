// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Solo node daemon (solod)
//!
//! Runs the tasks in a TOML config on this node, coordinating with every other
//! node pointed at the same state directory.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;
mod shell;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use solo_core::SoloConfig;
use tracing::{error, info};

use crate::lifecycle::LifecycleError;

#[derive(Parser)]
#[command(name = "solod", version, about = "Exactly-once periodic tasks across a cluster")]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run this node's tasks until SIGINT or SIGTERM
    Run {
        /// Path to the node config
        config: PathBuf,
    },
    /// Validate a config and print the task ids it registers
    Check {
        /// Path to the node config
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => match lifecycle::check(&config) {
            Ok(tasks) => {
                for (id, schedule) in tasks {
                    println!("{id}\t{schedule}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("solod: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Run { config } => {
            let _log_guard = match setup_logging(cli.log_file.as_deref()) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("solod: failed to set up logging: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match run(&config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Failed to run node: {}", e);
                    eprintln!("solod: {e}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run(path: &Path) -> Result<(), LifecycleError> {
    info!("Starting solod with config {}", path.display());
    let config = SoloConfig::load(path)?;
    let registry = lifecycle::build(&config)?;
    info!(tasks = registry.len(), "tasks registered");
    lifecycle::run_until_signalled(registry).await
}

fn setup_logging(
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    // Create log directory if needed
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        )
    })?;

    let file_appender = tracing_appender::rolling::never(&dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(Some(guard))
}
