// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM invocation surface.
//!
//! `query` starts one invocation and hands back a [`QueryHandle`]: a
//! channel of SDK messages plus an abort hook. The stream closing cleanly
//! is success; an `error`-typed message or a failed `query` call is
//! failure. Cancellation aborts the underlying invocation.

mod process;

pub use process::ProcessLlmAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use drover_core::SdkMessage;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

/// Errors from LLM invocations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("stream failed: {0}")]
    StreamFailed(String),
}

/// One invocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub prompt: String,
    pub model: String,
    /// Working directory the invocation runs in
    pub cwd: PathBuf,
    /// Session id to resume, if continuing a conversation
    pub resume: Option<String>,
}

/// Handle to a running invocation.
#[derive(Debug)]
pub struct QueryHandle {
    messages: mpsc::Receiver<SdkMessage>,
    abort: Arc<Notify>,
}

impl QueryHandle {
    pub fn new(messages: mpsc::Receiver<SdkMessage>, abort: Arc<Notify>) -> Self {
        Self { messages, abort }
    }

    /// Receive the next SDK message. `None` once the stream ends.
    pub async fn recv(&mut self) -> Option<SdkMessage> {
        self.messages.recv().await
    }

    /// Abort the invocation. The message channel closes shortly after.
    ///
    /// `notify_one` stores a permit, so the abort is not lost when the
    /// producer task is between awaits.
    pub fn abort(&self) {
        self.abort.notify_one();
    }
}

/// Adapter for driving LLM invocations
#[async_trait]
pub trait LlmAdapter: Clone + Send + Sync + 'static {
    /// Start one invocation.
    ///
    /// Returns once the invocation is launched; messages arrive on the
    /// handle as the stream produces them.
    async fn query(&self, request: QueryRequest) -> Result<QueryHandle, LlmError>;
}
