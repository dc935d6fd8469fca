// ABOUTME: tt-pacer CLI - replays recorded telemetry through a pacing session and inspects plans
// ABOUTME: Prints prediction changes and final per-segment rows as JSON lines on stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Replay a recorded ride against a plan
//! tt-pacer replay --plan plan.json --telemetry ride.ndjson
//!
//! # Replay and keep the resulting state
//! tt-pacer replay --plan plan.json --telemetry ride.ndjson --state ./state.json
//!
//! # Show a plan's signature and totals
//! tt-pacer signature --plan plan.json
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tt_pacer::logging::LoggingConfig;

#[derive(Parser)]
#[command(
    name = "tt-pacer",
    about = "Time-trial pacing engine tools",
    long_about = "Replay recorded telemetry through the pacing engine and inspect pacing plans."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Feed NDJSON telemetry through a session
    Replay {
        /// Plan document (JSON)
        #[arg(long)]
        plan: PathBuf,

        /// Telemetry, one `{"atMs": ..., ...snapshot}` object per line
        #[arg(long)]
        telemetry: PathBuf,

        /// Persist session state to this file
        #[arg(long)]
        state: Option<PathBuf>,

        /// Manual distance offset in metres applied before the replay
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<f64>,
    },

    /// Print a plan's signature and totals
    Signature {
        /// Plan document (JSON)
        #[arg(long)]
        plan: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging.level = "debug".into();
    }
    logging.init()?;

    match cli.command {
        Command::Replay {
            plan,
            telemetry,
            state,
            offset,
        } => {
            commands::replay::run(commands::replay::ReplayArgs {
                plan,
                telemetry,
                state,
                offset,
            })
            .await?;
        }
        Command::Signature { plan } => commands::signature::run(&plan).await?,
    }

    Ok(())
}
