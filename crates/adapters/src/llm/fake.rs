// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake LLM adapter for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{LlmAdapter, LlmError, QueryHandle, QueryRequest};
use async_trait::async_trait;
use drover_core::SdkMessage;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Recorded call to FakeLlmAdapter
#[derive(Debug, Clone)]
pub struct QueryCall {
    pub prompt: String,
    pub model: String,
    pub cwd: std::path::PathBuf,
    pub resume: Option<String>,
}

/// One scripted step of a fake stream.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a message
    Message(SdkMessage),
    /// Sleep before the next step
    Delay(Duration),
    /// Block until the invocation is aborted
    Hang,
}

struct FakeLlmState {
    /// Scripts consumed one per query; the default script is used when empty
    scripts: VecDeque<Vec<ScriptStep>>,
    calls: Vec<QueryCall>,
    query_error: Option<String>,
}

/// Fake LLM adapter for testing
///
/// Streams scripted messages and records every call. The default script is
/// a session-init system message, one assistant reply, and a success
/// result.
#[derive(Clone)]
pub struct FakeLlmAdapter {
    inner: Arc<Mutex<FakeLlmState>>,
}

impl Default for FakeLlmAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLlmAdapter {
    /// Create a new fake adapter with the default script.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeLlmState {
                scripts: VecDeque::new(),
                calls: Vec::new(),
                query_error: None,
            })),
        }
    }

    /// The default script: init, one assistant reply, success result.
    pub fn default_script() -> Vec<ScriptStep> {
        vec![
            ScriptStep::Message(SdkMessage::from_value(json!({
                "type": "system",
                "subtype": "init",
                "session_id": "fake-session-1",
            }))),
            ScriptStep::Message(SdkMessage::assistant_text("All done.")),
            ScriptStep::Message(SdkMessage::from_value(json!({
                "type": "result",
                "subtype": "success",
                "session_id": "fake-session-1",
            }))),
        ]
    }

    /// Queue a script for the next query. Queued scripts are consumed in
    /// FIFO order; queries past the queue get the default script.
    pub fn push_script(&self, steps: Vec<ScriptStep>) {
        self.inner.lock().scripts.push_back(steps);
    }

    /// Make the next `query` call fail outright.
    pub fn set_query_error(&self, message: impl Into<String>) {
        self.inner.lock().query_error = Some(message.into());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<QueryCall> {
        self.inner.lock().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }
}

#[async_trait]
impl LlmAdapter for FakeLlmAdapter {
    async fn query(&self, request: QueryRequest) -> Result<QueryHandle, LlmError> {
        let script = {
            let mut state = self.inner.lock();
            state.calls.push(QueryCall {
                prompt: request.prompt.clone(),
                model: request.model.clone(),
                cwd: request.cwd.clone(),
                resume: request.resume.clone(),
            });
            if let Some(message) = state.query_error.take() {
                return Err(LlmError::SpawnFailed(message));
            }
            state
                .scripts
                .pop_front()
                .unwrap_or_else(Self::default_script)
        };

        let (tx, rx) = mpsc::channel(64);
        let abort = Arc::new(Notify::new());
        let abort_task = Arc::clone(&abort);

        tokio::spawn(async move {
            for step in script {
                match step {
                    ScriptStep::Message(message) => {
                        if tx.send(message).await.is_err() {
                            return;
                        }
                    }
                    ScriptStep::Delay(duration) => {
                        tokio::select! {
                            _ = abort_task.notified() => return,
                            _ = tokio::time::sleep(duration) => {}
                        }
                    }
                    ScriptStep::Hang => {
                        abort_task.notified().await;
                        return;
                    }
                }
            }
        });

        Ok(QueryHandle::new(rx, abort))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
