// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet file model.
//!
//! ```yaml
//! version: 1
//! fleet:
//!   name: my-fleet
//! agents:
//!   - path: agents/reviewer.yaml
//!   - path: agents/janitor.yaml
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported fleet file schema version.
pub const FLEET_FILE_VERSION: u32 = 1;

/// Top-level fleet file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetFile {
    pub version: u32,
    #[serde(default)]
    pub fleet: FleetMeta,
    #[serde(default)]
    pub agents: Vec<AgentRef>,
}

/// Fleet-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reference to an agent file, relative to the fleet file's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRef {
    pub path: PathBuf,
}
