// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet config loading: parse, validate, resolve.
//!
//! Parsing and validation never touch live state; callers swap the returned
//! [`ResolvedConfig`] in wholesale (or keep the previous one on failure).

use crate::agent::{AgentFile, ResolvedAgent};
use crate::fleet::{FleetFile, FleetMeta, FLEET_FILE_VERSION};
use drover_core::{parse_interval, FleetError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {}", errors.join("; "))]
    Invalid {
        config_path: PathBuf,
        errors: Vec<String>,
    },
}

impl ConfigError {
    /// Convert into the control-plane taxonomy.
    pub fn into_fleet_error(self) -> FleetError {
        match self {
            ConfigError::Io { path, source } => FleetError::Configuration {
                config_path: Some(path.clone()),
                errors: vec![format!("failed to read {}: {}", path.display(), source)],
            },
            ConfigError::Parse { path, source } => FleetError::Configuration {
                config_path: Some(path),
                errors: vec![source.to_string()],
            },
            ConfigError::Invalid {
                config_path,
                errors,
            } => FleetError::Configuration {
                config_path: Some(config_path),
                errors,
            },
        }
    }
}

/// The fully resolved fleet configuration.
///
/// Immutable after resolve; reload produces a fresh instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub fleet: FleetMeta,
    /// Ordered as referenced by the fleet file
    pub agents: Vec<ResolvedAgent>,
    /// Absolute path of the fleet file
    pub config_path: PathBuf,
    /// Directory containing the fleet file
    pub config_dir: PathBuf,
    /// sha256 over the fleet file and every agent file, for cheap
    /// no-change detection on reload
    pub content_hash: String,
}

impl ResolvedConfig {
    pub fn agent(&self, name: &str) -> Option<&ResolvedAgent> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name.clone()).collect()
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_working_dir(agent: &AgentFile, agent_dir: &Path, config_dir: &Path) -> PathBuf {
    match &agent.working_dir {
        None => agent_dir.to_path_buf(),
        Some(wd) => {
            let root = Path::new(wd.root());
            if root.is_absolute() {
                root.to_path_buf()
            } else {
                config_dir.join(root)
            }
        }
    }
}

/// Load and resolve a fleet configuration.
///
/// Agent paths resolve relative to the fleet file's directory. All
/// validation errors are accumulated into one `Invalid` error so a single
/// pass reports every problem.
pub fn load_config(config_path: &Path) -> Result<ResolvedConfig, ConfigError> {
    let config_path = config_path
        .canonicalize()
        .map_err(|source| ConfigError::Io {
            path: config_path.to_path_buf(),
            source,
        })?;
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let fleet_text = read_file(&config_path)?;
    let fleet: FleetFile =
        serde_yaml::from_str(&fleet_text).map_err(|source| ConfigError::Parse {
            path: config_path.clone(),
            source,
        })?;

    let mut hasher = Sha256::new();
    hasher.update(fleet_text.as_bytes());

    let mut errors = Vec::new();
    if fleet.version != FLEET_FILE_VERSION {
        errors.push(format!(
            "unsupported fleet file version {} (expected {})",
            fleet.version, FLEET_FILE_VERSION
        ));
    }

    // First occurrence of each name, for duplicate reporting
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut agents = Vec::new();

    for agent_ref in &fleet.agents {
        let agent_path = if agent_ref.path.is_absolute() {
            agent_ref.path.clone()
        } else {
            config_dir.join(&agent_ref.path)
        };

        let agent_text = match read_file(&agent_path) {
            Ok(text) => text,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };
        hasher.update(agent_text.as_bytes());

        let agent_file: AgentFile = match serde_yaml::from_str(&agent_text) {
            Ok(a) => a,
            Err(e) => {
                errors.push(format!("failed to parse {}: {}", agent_path.display(), e));
                continue;
            }
        };

        if let Some(first) = seen.get(&agent_file.name) {
            errors.push(format!(
                "duplicate agent name: {} ({} and {})",
                agent_file.name,
                first.display(),
                agent_path.display()
            ));
            continue;
        }
        seen.insert(agent_file.name.clone(), agent_path.clone());

        if agent_file.max_concurrent == 0 {
            errors.push(format!(
                "agent {}: max_concurrent must be at least 1",
                agent_file.name
            ));
        }

        for (name, sched) in &agent_file.schedules {
            if sched.schedule_type != "interval" {
                errors.push(format!(
                    "agent {}: schedule {}: unsupported type '{}'",
                    agent_file.name, name, sched.schedule_type
                ));
                continue;
            }
            if let Err(e) = parse_interval(&sched.interval) {
                errors.push(format!(
                    "agent {}: schedule {}: {}",
                    agent_file.name, name, e
                ));
            }
        }

        let agent_dir = agent_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir.clone());
        let working_dir = resolve_working_dir(&agent_file, &agent_dir, &config_dir);

        agents.push(ResolvedAgent {
            name: agent_file.name,
            model: agent_file.model,
            working_dir,
            max_concurrent: agent_file.max_concurrent,
            runtime: agent_file.runtime,
            schedules: agent_file.schedules,
            chat: agent_file.chat,
            config_dir: agent_dir,
        });
    }

    if !errors.is_empty() {
        return Err(ConfigError::Invalid {
            config_path,
            errors,
        });
    }

    let content_hash = format!("{:x}", hasher.finalize());

    Ok(ResolvedConfig {
        fleet: fleet.fleet,
        agents,
        config_dir,
        config_path,
        content_hash,
    })
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
