// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query and housekeeping over the job store.

use chrono::{DateTime, Utc};
use drover_core::{FleetError, Job, JobId, JobStatus, SdkMessage};
use drover_storage::{
    apply_retention, stream::stream_output, JobStore, OutputStream, RetentionPolicy, StoreError,
};
use std::path::PathBuf;
use std::time::Duration;

/// Filters for job queries.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub agent: Option<String>,
    pub status: Option<JobStatus>,
    pub started_after: Option<DateTime<Utc>>,
    pub started_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// One page of query results.
#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Matches before paging
    pub total: usize,
    /// Metadata files that failed to parse (skipped, not fatal)
    pub errors: usize,
}

/// Read-side manager over the metadata/output store.
#[derive(Clone)]
pub struct JobManager {
    store: JobStore,
    state_dir: PathBuf,
    poll_interval: Duration,
}

impl JobManager {
    pub fn new(store: JobStore, state_dir: PathBuf) -> Self {
        Self {
            store,
            state_dir,
            poll_interval: drover_storage::stream::DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the stream poll interval (tests).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn store_error(&self, error: StoreError) -> FleetError {
        match error {
            StoreError::JobNotFound(id) => FleetError::JobNotFound {
                job_id: id.to_string(),
            },
            other => FleetError::StateDir {
                state_dir: self.state_dir.clone(),
                source: std::io::Error::other(other.to_string()),
            },
        }
    }

    /// List jobs matching a filter, newest first by `started_at`.
    ///
    /// `total` counts matches before `limit`/`offset` are applied.
    pub fn get_jobs(&self, filter: &JobFilter) -> Result<JobPage, FleetError> {
        let (jobs, errors) = self.store.load_all().map_err(|e| self.store_error(e))?;

        let mut matches: Vec<Job> = jobs
            .into_iter()
            .filter(|job| {
                filter.agent.as_deref().is_none_or(|a| job.agent == a)
                    && filter.status.is_none_or(|s| job.status == s)
                    && filter
                        .started_after
                        .is_none_or(|t| job.started_at > t)
                    && filter
                        .started_before
                        .is_none_or(|t| job.started_at < t)
            })
            .collect();

        matches.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        let total = matches.len();

        let jobs: Vec<Job> = matches
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(JobPage {
            jobs,
            total,
            errors,
        })
    }

    /// Fetch one job, optionally with its full output sequence.
    pub fn get_job(
        &self,
        id: &JobId,
        include_output: bool,
    ) -> Result<(Job, Option<Vec<SdkMessage>>), FleetError> {
        let job = self.store.read(id).map_err(|e| self.store_error(e))?;
        let output = if include_output {
            Some(self.store.read_output(id).map_err(|e| self.store_error(e))?)
        } else {
            None
        };
        Ok((job, output))
    }

    /// Live handle over a job's output.
    ///
    /// Tolerant of not-yet-started jobs: emits nothing until writes appear.
    pub fn stream_job_output(&self, id: &JobId) -> OutputStream {
        stream_output(self.store.clone(), id.clone(), self.poll_interval)
    }

    /// Enforce retention caps. Returns the number of jobs deleted.
    pub fn apply_retention(&self, policy: &RetentionPolicy) -> Result<usize, FleetError> {
        apply_retention(&self.store, policy).map_err(|e| self.store_error(e))
    }
}

#[cfg(test)]
#[path = "job_manager_tests.rs"]
mod tests;
