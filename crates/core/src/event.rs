// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the drover fleet supervisor.
//!
//! Serializes with `{"type": "event:name", ...fields}` format; the tags are
//! the wire names subscribers key on.

use crate::job::{Job, JobId};
use crate::message::SdkMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why the scheduler skipped a due schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Schedule toggled off at runtime
    Disabled,
    /// A prior run is still in flight, or the agent is at its concurrency cap
    AlreadyRunning,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => write!(f, "disabled"),
            SkipReason::AlreadyRunning => write!(f, "already_running"),
        }
    }
}

/// Kind of configuration change detected on reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// What a configuration change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    Agent,
    Schedule,
}

/// One entry in a reload change set.
///
/// Schedule changes are named `"<agent>/<schedule>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    #[serde(rename = "type")]
    pub change: ChangeKind,
    pub category: ChangeCategory,
    pub name: String,
}

impl ConfigChange {
    pub fn agent(change: ChangeKind, name: impl Into<String>) -> Self {
        Self {
            change,
            category: ChangeCategory::Agent,
            name: name.into(),
        }
    }

    pub fn schedule(change: ChangeKind, agent: &str, schedule: &str) -> Self {
        Self {
            change,
            category: ChangeCategory::Schedule,
            name: format!("{}/{}", agent, schedule),
        }
    }
}

/// Events emitted on the fleet bus.
///
/// Emission is synchronous fan-out; payload shapes are stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- lifecycle --
    #[serde(rename = "initialized")]
    Initialized {
        agent_count: usize,
        state_dir: PathBuf,
    },

    #[serde(rename = "started")]
    Started { agent_count: usize },

    #[serde(rename = "stopped")]
    Stopped {
        /// False when the stop timed out with jobs still in flight
        graceful: bool,
    },

    #[serde(rename = "config:reloaded")]
    ConfigReloaded {
        agent_count: usize,
        agent_names: Vec<String>,
        config_path: PathBuf,
        changes: Vec<ConfigChange>,
        timestamp: DateTime<Utc>,
    },

    // -- agent --
    #[serde(rename = "agent:started")]
    AgentStarted { agent: String },

    #[serde(rename = "agent:stopped")]
    AgentStopped { agent: String },

    // -- schedule --
    #[serde(rename = "schedule:triggered")]
    ScheduleTriggered {
        agent: String,
        schedule: String,
        job_id: JobId,
    },

    #[serde(rename = "schedule:skipped")]
    ScheduleSkipped {
        agent: String,
        schedule: String,
        reason: SkipReason,
    },

    // -- job --
    #[serde(rename = "job:created")]
    JobCreated { job: Job },

    #[serde(rename = "job:output")]
    JobOutput {
        job_id: JobId,
        agent: String,
        message: SdkMessage,
    },

    #[serde(rename = "job:completed")]
    JobCompleted { job_id: JobId, agent: String },

    #[serde(rename = "job:failed")]
    JobFailed {
        job_id: JobId,
        agent: String,
        error: String,
    },

    #[serde(rename = "job:cancelled")]
    JobCancelled { job_id: JobId, agent: String },

    #[serde(rename = "job:forked")]
    JobForked {
        job_id: JobId,
        agent: String,
        /// Prior job the session came from, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        forked_from: Option<JobId>,
        session_id: String,
    },

    // -- discord --
    #[serde(rename = "discord:error")]
    DiscordError { agent: String, message: String },

    #[serde(rename = "discord:message:handled")]
    DiscordMessageHandled {
        agent: String,
        channel_id: String,
        message_id: String,
        job_id: JobId,
    },

    #[serde(rename = "discord:message:error")]
    DiscordMessageError {
        agent: String,
        channel_id: String,
        message_id: String,
        error: String,
    },

    // -- slack --
    #[serde(rename = "slack:error")]
    SlackError { message: String },

    #[serde(rename = "slack:message:handled")]
    SlackMessageHandled {
        agent: String,
        channel_id: String,
        message_id: String,
        job_id: JobId,
    },

    #[serde(rename = "slack:message:error")]
    SlackMessageError {
        agent: String,
        channel_id: String,
        message_id: String,
        error: String,
    },
}

/// Subscription key: one tag per event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Initialized,
    Started,
    Stopped,
    ConfigReloaded,
    AgentStarted,
    AgentStopped,
    ScheduleTriggered,
    ScheduleSkipped,
    JobCreated,
    JobOutput,
    JobCompleted,
    JobFailed,
    JobCancelled,
    JobForked,
    DiscordError,
    DiscordMessageHandled,
    DiscordMessageError,
    SlackError,
    SlackMessageHandled,
    SlackMessageError,
}

impl Event {
    /// The subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Initialized { .. } => EventKind::Initialized,
            Event::Started { .. } => EventKind::Started,
            Event::Stopped { .. } => EventKind::Stopped,
            Event::ConfigReloaded { .. } => EventKind::ConfigReloaded,
            Event::AgentStarted { .. } => EventKind::AgentStarted,
            Event::AgentStopped { .. } => EventKind::AgentStopped,
            Event::ScheduleTriggered { .. } => EventKind::ScheduleTriggered,
            Event::ScheduleSkipped { .. } => EventKind::ScheduleSkipped,
            Event::JobCreated { .. } => EventKind::JobCreated,
            Event::JobOutput { .. } => EventKind::JobOutput,
            Event::JobCompleted { .. } => EventKind::JobCompleted,
            Event::JobFailed { .. } => EventKind::JobFailed,
            Event::JobCancelled { .. } => EventKind::JobCancelled,
            Event::JobForked { .. } => EventKind::JobForked,
            Event::DiscordError { .. } => EventKind::DiscordError,
            Event::DiscordMessageHandled { .. } => EventKind::DiscordMessageHandled,
            Event::DiscordMessageError { .. } => EventKind::DiscordMessageError,
            Event::SlackError { .. } => EventKind::SlackError,
            Event::SlackMessageHandled { .. } => EventKind::SlackMessageHandled,
            Event::SlackMessageError { .. } => EventKind::SlackMessageError,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Initialized => "initialized",
            EventKind::Started => "started",
            EventKind::Stopped => "stopped",
            EventKind::ConfigReloaded => "config:reloaded",
            EventKind::AgentStarted => "agent:started",
            EventKind::AgentStopped => "agent:stopped",
            EventKind::ScheduleTriggered => "schedule:triggered",
            EventKind::ScheduleSkipped => "schedule:skipped",
            EventKind::JobCreated => "job:created",
            EventKind::JobOutput => "job:output",
            EventKind::JobCompleted => "job:completed",
            EventKind::JobFailed => "job:failed",
            EventKind::JobCancelled => "job:cancelled",
            EventKind::JobForked => "job:forked",
            EventKind::DiscordError => "discord:error",
            EventKind::DiscordMessageHandled => "discord:message:handled",
            EventKind::DiscordMessageError => "discord:message:error",
            EventKind::SlackError => "slack:error",
            EventKind::SlackMessageHandled => "slack:message:handled",
            EventKind::SlackMessageError => "slack:message:error",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
