// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared by other crates' tests.
#![cfg_attr(coverage_nightly, coverage(off))]
#![allow(clippy::unwrap_used)]

use crate::job::{Job, JobId, TriggerKind};
use chrono::{DateTime, TimeZone, Utc};

/// A fixed, readable timestamp for tests.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

/// Builder for job fixtures.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            job: Job::new(
                JobId::new(id),
                agent,
                "Execute your configured task",
                TriggerKind::Manual,
                fixed_time(),
            ),
        }
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.job.prompt = prompt.into();
        self
    }

    pub fn trigger(mut self, trigger: TriggerKind) -> Self {
        self.job.trigger = trigger;
        self
    }

    pub fn schedule(mut self, schedule: impl Into<String>) -> Self {
        self.job.schedule = Some(schedule.into());
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.job.started_at = at;
        self
    }

    pub fn completed(mut self, at: DateTime<Utc>) -> Self {
        self.job.mark_running();
        self.job.complete(at);
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}
