// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation abstractions

use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::job::JobId;

/// Define a string-backed ID newtype.
///
/// The inner string stays private; construction goes through `new()` (or
/// the `From` conversions) and reads through `as_str()`/`Display`. Serde
/// treats the wrapper as the bare string.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

/// Length of the random suffix in a job id.
pub const JOB_SUFFIX_LEN: usize = 6;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates job identifiers of the form `job-YYYY-MM-DD-<6 base36 chars>`.
///
/// The date component reflects the job's start time in UTC. Uniqueness is
/// enforced by the store (collision retry), not the generator.
pub trait JobIdGen: Clone + Send + Sync + 'static {
    fn generate(&self, date: NaiveDate) -> JobId;
}

fn format_job_id(date: NaiveDate, suffix: &str) -> JobId {
    JobId::new(format!("job-{}-{}", date.format("%Y-%m-%d"), suffix))
}

/// UUID-backed generator for production use.
///
/// The 128 random bits of a v4 UUID are folded into a 6-character lowercase
/// base36 suffix.
#[derive(Clone, Default)]
pub struct RandomJobIdGen;

impl JobIdGen for RandomJobIdGen {
    fn generate(&self, date: NaiveDate) -> JobId {
        let mut n = uuid::Uuid::new_v4().as_u128();
        let mut suffix = String::with_capacity(JOB_SUFFIX_LEN);
        for _ in 0..JOB_SUFFIX_LEN {
            suffix.push(BASE36[(n % 36) as usize] as char);
            n /= 36;
        }
        format_job_id(date, &suffix)
    }
}

/// Sequential generator for deterministic tests.
///
/// Suffixes are the counter value base36-encoded and zero-padded to six
/// characters, so ids still match the production shape.
#[derive(Clone)]
pub struct SequentialJobIdGen {
    counter: Arc<AtomicU64>,
}

impl SequentialJobIdGen {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for SequentialJobIdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl JobIdGen for SequentialJobIdGen {
    fn generate(&self, date: NaiveDate) -> JobId {
        let mut n = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut digits = [b'0'; JOB_SUFFIX_LEN];
        for slot in digits.iter_mut().rev() {
            *slot = BASE36[(n % 36) as usize];
            n /= 36;
        }
        let suffix = std::str::from_utf8(&digits).unwrap_or("000000");
        format_job_id(date, suffix)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
