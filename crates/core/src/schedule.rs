// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime state for interval schedules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Runtime status of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// No job from this schedule is in flight
    Idle,
    /// A job from this schedule is pending or running
    Running,
    /// Toggled off at runtime
    Disabled,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Idle => write!(f, "idle"),
            ScheduleStatus::Running => write!(f, "running"),
            ScheduleStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// Per-(agent, schedule) runtime bookkeeping owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub status: ScheduleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at: Option<DateTime<Utc>>,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self {
            status: ScheduleStatus::Idle,
            last_run_at: None,
            next_run_at: None,
        }
    }
}

impl ScheduleState {
    /// Check whether an interval schedule is due.
    ///
    /// A fresh schedule with no prior run is immediately due.
    pub fn is_due(&self, interval: Duration, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => {
                let elapsed = now.signed_duration_since(last);
                elapsed >= chrono::Duration::milliseconds(interval.as_millis() as i64)
            }
        }
    }

    /// Record a fire: stamps `last_run_at` and computes `next_run_at`.
    pub fn record_fire(&mut self, interval: Duration, now: DateTime<Utc>) {
        self.last_run_at = Some(now);
        self.next_run_at = now
            .checked_add_signed(chrono::Duration::milliseconds(interval.as_millis() as i64));
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
