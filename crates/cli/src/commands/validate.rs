// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `drover validate` - resolve the config and report.

use anyhow::{bail, Result};
use drover_config::{load_config, ConfigError};
use std::path::Path;

pub fn run(config: &Path) -> Result<()> {
    match load_config(config) {
        Ok(resolved) => {
            let fleet_name = resolved.fleet.name.as_deref().unwrap_or("(unnamed)");
            println!("fleet: {fleet_name}");
            println!("agents: {}", resolved.agents.len());
            for agent in &resolved.agents {
                println!("  {} (model: {}, max_concurrent: {})", agent.name, agent.model, agent.max_concurrent);
                for (name, schedule) in &agent.schedules {
                    let state = if schedule.enabled { "" } else { " [disabled]" };
                    println!("    schedule {name}: every {}{state}", schedule.interval);
                }
            }
            Ok(())
        }
        Err(ConfigError::Invalid { errors, .. }) => {
            eprintln!("invalid configuration:");
            for error in &errors {
                eprintln!("  - {error}");
            }
            bail!("{} validation error(s)", errors.len());
        }
        Err(e) => bail!(e.to_string()),
    }
}
