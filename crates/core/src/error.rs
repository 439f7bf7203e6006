// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane error taxonomy.
//!
//! Every variant exposes a stable `code()` string and kind-specific fields.
//! Subsystem errors (store, config, adapters) are converted into these at
//! the public surface; peripheral failures are logged and swallowed instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a cancellation request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelFailure {
    NotRunning,
    ProcessError,
    Timeout,
    Unknown,
}

impl fmt::Display for CancelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelFailure::NotRunning => write!(f, "not_running"),
            CancelFailure::ProcessError => write!(f, "process_error"),
            CancelFailure::Timeout => write!(f, "timeout"),
            CancelFailure::Unknown => write!(f, "unknown"),
        }
    }
}

/// Why a fork request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForkFailure {
    NoSession,
    JobNotFound,
    AgentNotFound,
    Unknown,
}

impl fmt::Display for ForkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkFailure::NoSession => write!(f, "no_session"),
            ForkFailure::JobNotFound => write!(f, "job_not_found"),
            ForkFailure::AgentNotFound => write!(f, "agent_not_found"),
            ForkFailure::Unknown => write!(f, "unknown"),
        }
    }
}

/// Errors raised by the fleet control surface.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Control operation called in the wrong manager state
    #[error("operation '{operation}' requires state '{expected}' but manager is '{current}'")]
    InvalidState {
        operation: String,
        current: String,
        expected: String,
    },

    #[error("agent not found: {agent}")]
    AgentNotFound {
        agent: String,
        available: Vec<String>,
    },

    #[error("schedule '{schedule}' not found on agent '{agent}'")]
    ScheduleNotFound {
        agent: String,
        schedule: String,
        available: Vec<String>,
    },

    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("agent '{agent}' is at its concurrency limit ({current_jobs}/{limit})")]
    ConcurrencyLimit {
        agent: String,
        current_jobs: usize,
        limit: usize,
    },

    #[error("invalid configuration: {}", errors.join("; "))]
    Configuration {
        config_path: Option<PathBuf>,
        errors: Vec<String>,
    },

    #[error("state directory unavailable: {state_dir}")]
    StateDir {
        state_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shutdown {}", if *timed_out { "timed out with jobs still in flight" } else { "failed" })]
    Shutdown { timed_out: bool },

    #[error("cannot cancel job {job_id}: {reason}")]
    JobCancel {
        job_id: String,
        reason: CancelFailure,
    },

    #[error("cannot fork job {original_job_id}: {reason}")]
    JobFork {
        original_job_id: String,
        reason: ForkFailure,
    },
}

impl FleetError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::InvalidState { .. } => "invalid-state",
            FleetError::AgentNotFound { .. } => "agent-not-found",
            FleetError::ScheduleNotFound { .. } => "schedule-not-found",
            FleetError::JobNotFound { .. } => "job-not-found",
            FleetError::ConcurrencyLimit { .. } => "concurrency-limit",
            FleetError::Configuration { .. } => "configuration",
            FleetError::StateDir { .. } => "state-dir",
            FleetError::Shutdown { .. } => "shutdown",
            FleetError::JobCancel { .. } => "job-cancel",
            FleetError::JobFork { .. } => "job-fork",
        }
    }

    pub fn invalid_state(
        operation: impl Into<String>,
        current: impl fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        FleetError::InvalidState {
            operation: operation.into(),
            current: current.to_string(),
            expected: expected.into(),
        }
    }

    pub fn agent_not_found(agent: impl Into<String>, available: Vec<String>) -> Self {
        FleetError::AgentNotFound {
            agent: agent.into(),
            available,
        }
    }

    pub fn schedule_not_found(
        agent: impl Into<String>,
        schedule: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        FleetError::ScheduleNotFound {
            agent: agent.into(),
            schedule: schedule.into(),
            available,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
