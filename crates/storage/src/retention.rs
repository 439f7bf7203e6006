// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention caps over the job store.

use crate::job_store::{JobStore, StoreError};
use drover_core::Job;
use std::collections::HashMap;
use tracing::warn;

/// Retention caps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Newest jobs kept per agent
    pub max_jobs_per_agent: usize,
    /// Fleet-wide cap; 0 means unlimited
    pub max_total_jobs: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_jobs_per_agent: 100,
            max_total_jobs: 0,
        }
    }
}

/// Enforce retention caps. Returns the number of jobs deleted.
///
/// Pass 1 keeps the newest `max_jobs_per_agent` per agent by `started_at`;
/// pass 2 trims the oldest across all agents until the fleet cap (if set)
/// is satisfied. Failing to delete one job is logged and does not abort
/// the rest.
pub fn apply_retention(store: &JobStore, policy: &RetentionPolicy) -> Result<usize, StoreError> {
    let (jobs, parse_errors) = store.load_all()?;
    if parse_errors > 0 {
        warn!(parse_errors, "retention skipping unreadable job metadata");
    }

    let mut deleted = 0;
    let mut survivors: Vec<Job> = Vec::with_capacity(jobs.len());

    let mut by_agent: HashMap<String, Vec<Job>> = HashMap::new();
    for job in jobs {
        by_agent.entry(job.agent.clone()).or_default().push(job);
    }

    for (_, mut agent_jobs) in by_agent {
        // Newest first; everything past the cap goes
        agent_jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        for (index, job) in agent_jobs.into_iter().enumerate() {
            if index < policy.max_jobs_per_agent {
                survivors.push(job);
            } else {
                deleted += delete_one(store, &job);
            }
        }
    }

    if policy.max_total_jobs > 0 && survivors.len() > policy.max_total_jobs {
        // Oldest first across all agents
        survivors.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        let excess = survivors.len() - policy.max_total_jobs;
        for job in survivors.iter().take(excess) {
            deleted += delete_one(store, job);
        }
    }

    Ok(deleted)
}

fn delete_one(store: &JobStore, job: &Job) -> usize {
    match store.delete(&job.id) {
        Ok(()) => 1,
        Err(e) => {
            warn!(job_id = %job.id, error = %e, "retention failed to delete job");
            0
        }
    }
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
