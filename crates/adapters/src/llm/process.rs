// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess LLM adapter.
//!
//! Spawns a runtime command per invocation and parses JSONL SDK messages
//! from its stdout. The child is killed when the invocation is aborted.

use super::{LlmAdapter, LlmError, QueryHandle, QueryRequest};
use async_trait::async_trait;
use drover_core::SdkMessage;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

/// LLM adapter that shells out to a stream-JSON runtime CLI.
///
/// The invocation is `<program> <args…> [--model <m>] [--resume <id>] <prompt>`,
/// run in the request's working directory. Stdout must carry one SDK
/// message object per line; unparseable lines are skipped with a warning.
#[derive(Debug, Clone)]
pub struct ProcessLlmAdapter {
    program: String,
    args: Vec<String>,
    /// Pass `--model <model>` to the child
    pass_model: bool,
}

impl ProcessLlmAdapter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            pass_model: true,
        }
    }

    /// Skip the `--model` flag for runtimes that don't accept one.
    pub fn without_model_flag(mut self) -> Self {
        self.pass_model = false;
        self
    }
}

#[async_trait]
impl LlmAdapter for ProcessLlmAdapter {
    async fn query(&self, request: QueryRequest) -> Result<QueryHandle, LlmError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if self.pass_model {
            cmd.arg("--model").arg(&request.model);
        }
        if let Some(resume) = &request.resume {
            cmd.arg("--resume").arg(resume);
        }
        cmd.arg(&request.prompt);
        cmd.current_dir(&request.cwd);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| LlmError::SpawnFailed(format!("{}: {}", self.program, e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LlmError::SpawnFailed("child stdout unavailable".to_string()))?;

        let (tx, rx) = mpsc::channel(64);
        let abort = Arc::new(Notify::new());
        let abort_task = Arc::clone(&abort);
        let program = self.program.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    _ = abort_task.notified() => {
                        debug!(program = %program, "aborting runtime child");
                        let _ = child.kill().await;
                        return;
                    }
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let trimmed = line.trim();
                            if trimmed.is_empty() {
                                continue;
                            }
                            match SdkMessage::parse_line(trimmed) {
                                Ok(message) => {
                                    if tx.send(message).await.is_err() {
                                        let _ = child.kill().await;
                                        return;
                                    }
                                }
                                Err(e) => {
                                    warn!(program = %program, error = %e, "skipping unparseable runtime output line");
                                }
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(program = %program, error = %e, "runtime stdout read failed");
                            break;
                        }
                    }
                }
            }

            // Surface a non-zero exit as a stream error message
            match child.wait().await {
                Ok(status) if !status.success() => {
                    let _ = tx
                        .send(SdkMessage::error(format!(
                            "runtime exited with {}",
                            status
                        )))
                        .await;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(program = %program, error = %e, "failed to reap runtime child");
                }
            }
        });

        Ok(QueryHandle::new(rx, abort))
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
