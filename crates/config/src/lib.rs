// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-config: Fleet and agent configuration model.
//!
//! A fleet file references agent files by relative path. Loading parses,
//! validates, and resolves everything into an immutable [`ResolvedConfig`];
//! reload replaces the whole object, never mutating it in place.

pub mod agent;
pub mod diff;
pub mod fleet;
pub mod loader;

pub use agent::{
    AgentFile, ChatBindings, DiscordBinding, OutputFlags, ResolvedAgent, ScheduleDef,
    SlackBinding, WorkingDir,
};
pub use diff::diff_configs;
pub use fleet::{AgentRef, FleetFile, FleetMeta};
pub use loader::{load_config, ConfigError, ResolvedConfig};
