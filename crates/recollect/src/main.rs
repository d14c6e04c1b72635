// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recollect - memory deduplication and retrieval cache.
//!
//! This is the command-line entry point.

mod commands;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Recollect - memory deduplication and retrieval cache.
#[derive(Parser, Debug)]
#[command(name = "recollect", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a message through detection and deduplication; prints JSON.
    Remember {
        #[arg(long)]
        user: String,
        /// Message timestamp (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        message: String,
    },
    /// Print the prompt context block for a message.
    Context {
        #[arg(long)]
        user: String,
        message: String,
    },
    /// Deactivate a stored memory.
    Forget {
        #[arg(long)]
        id: String,
    },
    /// Validate and print the effective configuration.
    Config,
    /// Check the store, embedder and detector.
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => recollect_config::load_and_validate_path(path),
        None => recollect_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            recollect_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    commands::init_tracing(&config.service.log_level);
    recollect_memory::recording::register_metrics();

    let result = match cli.command {
        Commands::Remember { user, at, message } => {
            commands::run_remember(&config, &user, at, &message).await
        }
        Commands::Context { user, message } => {
            commands::run_context(&config, &user, &message).await
        }
        Commands::Forget { id } => commands::run_forget(&config, &id).await,
        Commands::Config => commands::run_config(&config),
        Commands::Health => commands::run_health(&config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
