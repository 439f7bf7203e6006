// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent file model and resolved agent definitions.

use drover_core::DEFAULT_SESSION_EXPIRY_HOURS;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "default".to_string()
}

fn default_max_concurrent() -> usize {
    1
}

fn default_runtime() -> String {
    "sdk".to_string()
}

fn default_schedule_type() -> String {
    "interval".to_string()
}

fn default_session_expiry() -> u32 {
    DEFAULT_SESSION_EXPIRY_HOURS
}

fn default_max_output_chars() -> usize {
    900
}

/// Working directory declaration: a bare string or an object with a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkingDir {
    Path(String),
    Object { root: String },
}

impl WorkingDir {
    /// The declared root path, whichever shape was used.
    pub fn root(&self) -> &str {
        match self {
            WorkingDir::Path(p) => p,
            WorkingDir::Object { root } => root,
        }
    }
}

/// One schedule definition on an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDef {
    /// Schedule type; `interval` is the only built-in
    #[serde(rename = "type", default = "default_schedule_type")]
    pub schedule_type: String,
    /// Interval duration string (e.g. "30m", "1h")
    pub interval: String,
    /// Prompt used when the schedule fires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Per-message output rendering toggles for chat surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFlags {
    /// Render an embed per tool invocation
    #[serde(default = "default_true")]
    pub tool_results: bool,
    /// Render system status messages
    #[serde(default)]
    pub system_status: bool,
    /// Render the final result summary
    #[serde(default = "default_true")]
    pub result_summary: bool,
    /// Render stream errors
    #[serde(default = "default_true")]
    pub errors: bool,
    /// Cap on rendered tool output, before the platform field cap
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
}

impl Default for OutputFlags {
    fn default() -> Self {
        Self {
            tool_results: true,
            system_status: false,
            result_summary: true,
            errors: true,
            max_output_chars: default_max_output_chars(),
        }
    }
}

/// Discord binding for an agent: one connector per bound agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordBinding {
    /// Env var holding the bot token
    pub bot_token_env: String,
    /// Reply mode hint forwarded by the connector (e.g. "mention")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub output: OutputFlags,
    #[serde(default = "default_session_expiry")]
    pub session_expiry_hours: u32,
}

/// Slack binding for an agent: all bound agents share one connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackBinding {
    /// Env var holding the bot token
    pub bot_token_env: String,
    /// Env var holding the app-level token
    pub app_token_env: String,
    /// Channels routed to this agent
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub output: OutputFlags,
    #[serde(default = "default_session_expiry")]
    pub session_expiry_hours: u32,
}

/// Chat bindings on an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordBinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackBinding>,
}

/// Raw agent file as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFile {
    /// Unique across the fleet; duplicates are a fatal config error
    pub name: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Defaults to the agent file's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<WorkingDir>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Runtime tag selecting the LLM adapter (e.g. "sdk")
    #[serde(default = "default_runtime")]
    pub runtime: String,
    #[serde(default)]
    pub schedules: IndexMap<String, ScheduleDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatBindings>,
}

/// Agent definition after path resolution.
///
/// Immutable once resolved; in-flight jobs keep the snapshot they were
/// launched with across config reloads.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAgent {
    pub name: String,
    pub model: String,
    /// Absolute working directory jobs execute in
    pub working_dir: PathBuf,
    pub max_concurrent: usize,
    pub runtime: String,
    pub schedules: IndexMap<String, ScheduleDef>,
    pub chat: Option<ChatBindings>,
    /// Directory of the agent file (the working-dir default)
    pub config_dir: PathBuf,
}

impl ResolvedAgent {
    pub fn schedule(&self, name: &str) -> Option<&ScheduleDef> {
        self.schedules.get(name)
    }

    pub fn schedule_names(&self) -> Vec<String> {
        self.schedules.keys().cloned().collect()
    }

    pub fn discord(&self) -> Option<&DiscordBinding> {
        self.chat.as_ref().and_then(|c| c.discord.as_ref())
    }

    pub fn slack(&self) -> Option<&SlackBinding> {
        self.chat.as_ref().and_then(|c| c.slack.as_ref())
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
