// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drover-adapters: Boundary traits for the fleet's external surfaces.
//!
//! Two seams are abstracted here:
//! - [`llm::LlmAdapter`] — the LLM invocation surface. The executor
//!   consumes a stream of SDK messages; the real SDK stays outside.
//! - [`chat::ChatConnector`] — chat platform endpoints, produced by a
//!   [`chat::ConnectorRegistry`]. An empty registry is the "integration
//!   library absent" case: managers log and skip.

pub mod chat;
pub mod llm;

pub use chat::{
    ChatConnector, ChatError, ChatEvent, ConnectorConfig, ConnectorRegistry, Embed, EmbedField,
    InboundMessage, OutboundPayload,
};
pub use llm::{LlmAdapter, LlmError, ProcessLlmAdapter, QueryHandle, QueryRequest};

#[cfg(any(test, feature = "test-support"))]
pub use chat::fake::{FakeConnector, SentPayload};
#[cfg(any(test, feature = "test-support"))]
pub use llm::fake::{FakeLlmAdapter, QueryCall, ScriptStep};
