// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-core: Shared types for the drover fleet supervisor

pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod interval;
pub mod job;
pub mod message;
pub mod schedule;
pub mod session;
pub mod time_fmt;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{CancelFailure, FleetError, ForkFailure};
pub use event::{ChangeCategory, ChangeKind, ConfigChange, Event, EventKind, SkipReason};
pub use id::{JobIdGen, RandomJobIdGen, SequentialJobIdGen};
pub use interval::{parse_interval, IntervalError};
pub use job::{ExitReason, Job, JobId, JobStatus, TriggerKind};
pub use message::{MessageKind, SdkMessage};
pub use schedule::{ScheduleState, ScheduleStatus};
pub use session::{ChatSession, DEFAULT_SESSION_EXPIRY_HOURS};
pub use time_fmt::{format_elapsed, format_elapsed_ms};
