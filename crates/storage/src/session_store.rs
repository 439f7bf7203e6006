// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent chat session persistence.
//!
//! One small YAML document per channel under `sessions/<agent>/`. Absence
//! means no session. Read and purge failures are peripheral: warn and
//! treat as no session.

use crate::job_store::StoreError;
use chrono::{DateTime, Utc};
use drover_core::ChatSession;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Map a channel id to a safe file name.
fn channel_file_name(channel_id: &str) -> String {
    channel_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Session store for one agent.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    agent: String,
}

impl SessionStore {
    /// Open the store, creating `<state_dir>/sessions/<agent>` recursively.
    pub fn open(state_dir: &Path, agent: &str) -> Result<Self, StoreError> {
        let dir = state_dir.join("sessions").join(channel_file_name(agent));
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            agent: agent.to_string(),
        })
    }

    fn path(&self, channel_id: &str) -> PathBuf {
        self.dir.join(channel_file_name(channel_id))
    }

    /// Look up the session for a channel.
    ///
    /// Missing file means no session; a corrupt record is warned about and
    /// treated the same way.
    pub fn get(&self, channel_id: &str) -> Option<ChatSession> {
        let path = self.path(channel_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(agent = %self.agent, channel_id, error = %e, "failed to read session record");
                return None;
            }
        };
        match serde_yaml::from_str(&text) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(agent = %self.agent, channel_id, error = %e, "corrupt session record ignored");
                None
            }
        }
    }

    /// Persist the session for a channel (atomic tmp+rename).
    pub fn put(&self, channel_id: &str, session: &ChatSession) -> Result<(), StoreError> {
        let path = self.path(channel_id);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, serde_yaml::to_string(session)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Remove the session for a channel, if any.
    pub fn remove(&self, channel_id: &str) {
        if let Err(e) = fs::remove_file(self.path(channel_id)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(agent = %self.agent, channel_id, error = %e, "failed to remove session record");
            }
        }
    }

    /// Number of stored session records.
    pub fn count(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0)
    }

    /// Delete records older than the expiry. Returns how many were removed.
    pub fn purge_expired(&self, expiry_hours: u32, now: DateTime<Utc>) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };

        let mut purged = 0;
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let expired = fs::read_to_string(&path)
                .ok()
                .and_then(|text| serde_yaml::from_str::<ChatSession>(&text).ok())
                .is_some_and(|session| session.is_expired(expiry_hours, now));
            if expired {
                match fs::remove_file(&path) {
                    Ok(()) => purged += 1,
                    Err(e) => {
                        warn!(agent = %self.agent, error = %e, "failed to purge expired session");
                    }
                }
            }
        }
        purged
    }
}

#[cfg(test)]
#[path = "session_store_tests.rs"]
mod tests;
