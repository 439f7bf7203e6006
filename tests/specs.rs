//! Behavioral specifications for the drover fleet supervisor.
//!
//! These tests exercise the public engine surface end-to-end with the fake
//! LLM adapter and fake chat connectors, plus a couple of black-box CLI
//! checks.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/chat.rs"]
mod chat;
#[path = "specs/cli.rs"]
mod cli;
#[path = "specs/concurrency.rs"]
mod concurrency;
#[path = "specs/lifecycle.rs"]
mod lifecycle;
#[path = "specs/reload.rs"]
mod reload;
#[path = "specs/retention.rs"]
mod retention;
#[path = "specs/streaming.rs"]
mod streaming;
