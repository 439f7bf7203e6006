// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-storage: State-directory persistence.
//!
//! Layout under `<state_dir>/`:
//! - `jobs/<jobId>.yaml` — job metadata, snake_case keys
//! - `jobs/<jobId>.jsonl` — append-only output log, one SDK message per line
//! - `sessions/<agent>/<channelId>` — chat session records
//!
//! Per-job files are only written by that job's executor; the output log is
//! append-only. Malformed metadata and output lines are counted/skipped,
//! never fatal.

pub mod job_store;
pub mod retention;
pub mod session_store;
pub mod stream;

pub use job_store::{JobStore, StoreError};
pub use retention::{apply_retention, RetentionPolicy};
pub use session_store::SessionStore;
pub use stream::{OutputStream, StreamEvent};
