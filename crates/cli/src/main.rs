// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drover - fleet supervisor for scheduled LLM agents

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod logging;
mod output;
mod runtime;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{jobs, start, status, trigger, validate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "drover",
    version,
    about = "Drover - a fleet supervisor for scheduled LLM agents"
)]
struct Cli {
    /// Path to the fleet config file
    #[arg(short = 'c', long = "config", global = true, default_value = "fleet.yaml")]
    config: PathBuf,

    /// State directory (defaults to .drover next to the config)
    #[arg(long = "state-dir", global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fleet in the foreground
    Start(start::StartArgs),
    /// Resolve and validate the fleet config
    Validate,
    /// Trigger one job and wait for it
    Trigger(trigger::TriggerArgs),
    /// Inspect and prune persisted jobs
    Jobs(jobs::JobsArgs),
    /// Summarize the state directory
    Status,
}

impl Cli {
    fn state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => dir.clone(),
            None => self
                .config
                .parent()
                .map(|p| p.join(".drover"))
                .unwrap_or_else(|| PathBuf::from(".drover")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let state_dir = cli.state_dir();

    match cli.command {
        Commands::Start(args) => start::run(&cli.config, &state_dir, args).await,
        Commands::Validate => validate::run(&cli.config),
        Commands::Trigger(args) => trigger::run(&cli.config, &state_dir, args).await,
        Commands::Jobs(args) => jobs::run(&state_dir, args).await,
        Commands::Status => status::run(&state_dir),
    }
}
