// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job metadata and output-log persistence.

use chrono::{DateTime, Utc};
use drover_core::{Job, JobId, JobIdGen, SdkMessage};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Attempts before giving up on a free job id.
const ID_ALLOC_ATTEMPTS: usize = 16;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("job not found: {0}")]
    JobNotFound(JobId),
    #[error("could not allocate a unique job id after {0} attempts")]
    IdExhausted(usize),
}

/// Store for job metadata (`jobs/<id>.yaml`) and output logs (`jobs/<id>.jsonl`).
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs_dir: PathBuf,
}

impl JobStore {
    /// Open the store, creating `<state_dir>/jobs` recursively.
    pub fn open(state_dir: &Path) -> Result<Self, StoreError> {
        let jobs_dir = state_dir.join("jobs");
        fs::create_dir_all(&jobs_dir)?;
        Ok(Self { jobs_dir })
    }

    /// Path of a job's metadata document.
    pub fn metadata_path(&self, id: &JobId) -> PathBuf {
        self.jobs_dir.join(format!("{}.yaml", id))
    }

    /// Path of a job's output log.
    pub fn output_path(&self, id: &JobId) -> PathBuf {
        self.jobs_dir.join(format!("{}.jsonl", id))
    }

    /// Allocate a fresh job id for the given start time.
    ///
    /// Ids embed the UTC date of `started_at`; collisions against existing
    /// metadata files are retried with a new random suffix.
    pub fn allocate_id(
        &self,
        id_gen: &impl JobIdGen,
        started_at: DateTime<Utc>,
    ) -> Result<JobId, StoreError> {
        let date = started_at.date_naive();
        for _ in 0..ID_ALLOC_ATTEMPTS {
            let id = id_gen.generate(date);
            if !self.metadata_path(&id).exists() {
                return Ok(id);
            }
        }
        Err(StoreError::IdExhausted(ID_ALLOC_ATTEMPTS))
    }

    /// Persist job metadata atomically (write to .tmp, then rename).
    pub fn write(&self, job: &Job) -> Result<(), StoreError> {
        let path = self.metadata_path(&job.id);
        let tmp_path = path.with_extension("yaml.tmp");
        let yaml = serde_yaml::to_string(job)?;
        fs::write(&tmp_path, yaml)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Load one job's metadata.
    pub fn read(&self, id: &JobId) -> Result<Job, StoreError> {
        let path = self.metadata_path(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::JobNotFound(id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Check whether metadata exists for a job id.
    pub fn exists(&self, id: &JobId) -> bool {
        self.metadata_path(id).exists()
    }

    /// Load every job in the store.
    ///
    /// Metadata files that fail to parse are skipped and counted, not fatal.
    pub fn load_all(&self) -> Result<(Vec<Job>, usize), StoreError> {
        let mut jobs = Vec::new();
        let mut errors = 0;

        for entry in fs::read_dir(&self.jobs_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|text| serde_yaml::from_str::<Job>(&text).map_err(StoreError::from))
            {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable job metadata");
                    errors += 1;
                }
            }
        }

        Ok((jobs, errors))
    }

    /// Append one message to a job's output log.
    ///
    /// One JSON object per line, in production order.
    pub fn append_output(&self, id: &JobId, message: &SdkMessage) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.output_path(id))?;
        file.write_all(&line)?;
        Ok(())
    }

    /// Read a job's full output log.
    ///
    /// A missing file yields an empty list (job not started yet). Malformed
    /// lines are skipped with a warning.
    pub fn read_output(&self, id: &JobId) -> Result<Vec<SdkMessage>, StoreError> {
        Ok(self.read_output_from(id, 0)?.0)
    }

    /// Read output lines starting at a byte offset.
    ///
    /// Returns the parsed messages and the offset just past the last
    /// complete line, for incremental tailing.
    pub fn read_output_from(
        &self,
        id: &JobId,
        offset: u64,
    ) -> Result<(Vec<SdkMessage>, u64), StoreError> {
        let bytes = match fs::read(self.output_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), offset)),
            Err(e) => return Err(e.into()),
        };
        if (offset as usize) >= bytes.len() {
            return Ok((Vec::new(), offset));
        }

        let tail = &bytes[offset as usize..];
        // Only consume up to the last complete line; a writer may be
        // mid-append past that point.
        let Some(last_newline) = tail.iter().rposition(|&b| b == b'\n') else {
            return Ok((Vec::new(), offset));
        };
        let complete = &tail[..=last_newline];

        let mut messages = Vec::new();
        for line in complete.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            match std::str::from_utf8(line)
                .ok()
                .and_then(|s| SdkMessage::parse_line(s).ok())
            {
                Some(msg) => messages.push(msg),
                None => {
                    warn!(job_id = %id, "skipping malformed output line");
                }
            }
        }

        Ok((messages, offset + complete.len() as u64))
    }

    /// Delete a job's metadata and output log.
    ///
    /// A missing or undeletable output file is logged at warn; metadata
    /// removal errors are returned.
    pub fn delete(&self, id: &JobId) -> Result<(), StoreError> {
        let output = self.output_path(id);
        if let Err(e) = fs::remove_file(&output) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(job_id = %id, error = %e, "failed to delete job output log");
            }
        }
        match fs::remove_file(self.metadata_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::JobNotFound(id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
