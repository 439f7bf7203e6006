// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency accounting for in-flight jobs.
//!
//! A job occupies a slot from the trigger call until it reaches a terminal
//! state; the executor releases the slot on every path before emitting the
//! terminal event. The tracker also owns each job's cancel handle.

use drover_core::JobId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

struct ActiveJob {
    agent: String,
    cancel: Arc<Notify>,
}

#[derive(Default)]
struct TrackerState {
    active: HashMap<String, usize>,
    jobs: HashMap<JobId, ActiveJob>,
}

/// Shared registry of non-terminal jobs.
#[derive(Clone, Default)]
pub struct JobTracker {
    inner: Arc<Mutex<TrackerState>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a slot for a job. Returns its cancel handle.
    pub fn begin(&self, agent: &str, job_id: &JobId) -> Arc<Notify> {
        let cancel = Arc::new(Notify::new());
        let mut state = self.inner.lock();
        *state.active.entry(agent.to_string()).or_insert(0) += 1;
        state.jobs.insert(
            job_id.clone(),
            ActiveJob {
                agent: agent.to_string(),
                cancel: Arc::clone(&cancel),
            },
        );
        cancel
    }

    /// Release a job's slot. Idempotent.
    pub fn finish(&self, job_id: &JobId) {
        let mut state = self.inner.lock();
        if let Some(job) = state.jobs.remove(job_id) {
            if let Some(count) = state.active.get_mut(&job.agent) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    state.active.remove(&job.agent);
                }
            }
        }
    }

    /// Non-terminal job count for one agent.
    pub fn active_count(&self, agent: &str) -> usize {
        self.inner.lock().active.get(agent).copied().unwrap_or(0)
    }

    /// Non-terminal job count across the fleet.
    pub fn total_active(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    /// Ids of all non-terminal jobs.
    pub fn active_job_ids(&self) -> Vec<JobId> {
        self.inner.lock().jobs.keys().cloned().collect()
    }

    /// Check whether a job is still tracked.
    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.inner.lock().jobs.contains_key(job_id)
    }

    /// Signal cancellation for one job. Returns false when untracked.
    ///
    /// `notify_one` stores a permit, so a signal that lands while the
    /// executor is between awaits is not lost.
    pub fn cancel(&self, job_id: &JobId) -> bool {
        let state = self.inner.lock();
        match state.jobs.get(job_id) {
            Some(job) => {
                job.cancel.notify_one();
                true
            }
            None => false,
        }
    }

    /// Signal cancellation for every tracked job.
    pub fn cancel_all(&self) {
        let state = self.inner.lock();
        for job in state.jobs.values() {
            job.cancel.notify_one();
        }
    }

    /// Wait until no jobs are tracked, up to `timeout`.
    ///
    /// Returns true when idle was reached.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.total_active() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
