// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat session records for multi-turn continuity.
//!
//! One record per chat channel, keyed by channel id and stored per agent.
//! Absence of a record means no session; an expired record is treated the
//! same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default session age limit in hours.
pub const DEFAULT_SESSION_EXPIRY_HOURS: u32 = 24;

/// Mapping from a chat channel to an LLM-side session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// LLM-side session id used as the resume hint
    pub session_id: String,
    pub last_message_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, last_message_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            last_message_at,
        }
    }

    /// Check whether the session has aged out.
    pub fn is_expired(&self, expiry_hours: u32, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_message_at) >= chrono::Duration::hours(expiry_hours as i64)
    }

    /// Refresh the activity timestamp.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_message_at = now;
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
