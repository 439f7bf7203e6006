// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identity and state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a job.
    ///
    /// Shaped `job-YYYY-MM-DD-<6 lowercase base36>` where the date reflects
    /// the job's start time in UTC. Unique forever within a state dir.
    #[derive(Default)]
    pub struct JobId;
}

/// How a job was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Explicit `trigger()` call
    Manual,
    /// Fired by the scheduler
    Schedule,
    /// Routed from a chat connector
    Chat,
    /// Forked from a prior job's session
    Fork,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Manual => write!(f, "manual"),
            TriggerKind::Schedule => write!(f, "schedule"),
            TriggerKind::Chat => write!(f, "chat"),
            TriggerKind::Fork => write!(f, "fork"),
        }
    }
}

/// Lifecycle status of a job.
///
/// Transitions are monotone: pending → running → one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Check if this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Why a job reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Success,
    Error,
    Cancelled,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Success => write!(f, "success"),
            ExitReason::Error => write!(f, "error"),
            ExitReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One execution of an agent, with persisted metadata.
///
/// Serialized as YAML (`jobs/<id>.yaml`) with snake_case field names.
/// Terminal jobs are immutable: the mutators below are no-ops once a
/// terminal status is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Name of the agent this job executes under
    pub agent: String,
    /// Schedule that fired this job, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    pub trigger: TriggerKind,
    pub prompt: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// LLM-side session id captured from the stream, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Job this one was forked from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forked_from: Option<JobId>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(
        id: JobId,
        agent: impl Into<String>,
        prompt: impl Into<String>,
        trigger: TriggerKind,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agent: agent.into(),
            schedule: None,
            trigger,
            prompt: prompt.into(),
            status: JobStatus::Pending,
            started_at,
            finished_at: None,
            exit_reason: None,
            error_message: None,
            session_id: None,
            forked_from: None,
        }
    }

    /// Set the originating schedule name
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = Some(schedule.into());
        self
    }

    /// Set the fork origin
    pub fn with_forked_from(mut self, origin: JobId) -> Self {
        self.forked_from = Some(origin);
        self
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition pending → running.
    pub fn mark_running(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
    }

    /// Record the LLM session id if not already set.
    pub fn record_session(&mut self, session_id: impl Into<String>) {
        if self.session_id.is_none() {
            self.session_id = Some(session_id.into());
        }
    }

    /// Transition to completed. No-op if already terminal.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.exit_reason = Some(ExitReason::Success);
        self.finished_at = Some(at);
    }

    /// Transition to failed with an error message. No-op if already terminal.
    pub fn fail(&mut self, error: impl Into<String>, at: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.exit_reason = Some(ExitReason::Error);
        self.error_message = Some(error.into());
        self.finished_at = Some(at);
    }

    /// Transition to cancelled. No-op if already terminal.
    pub fn cancel(&mut self, at: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.status = JobStatus::Cancelled;
        self.exit_reason = Some(ExitReason::Cancelled);
        self.finished_at = Some(at);
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
