// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming reply routing shared by the chat managers.
//!
//! A router receives each SDK message from the executor (via the trigger
//! `on_message` callback), classifies it, and sends the matching text or
//! embed into the originating channel. Send failures are logged, never
//! surfaced to the job.

use crate::embed::{build_error_embed, build_result_embed, build_status_embed, build_tool_embed};
use crate::extract::{
    extract_message_content, extract_tool_results, extract_tool_use_blocks, ToolUse,
};
use crate::split::{split_with, FenceMode};
use drover_adapters::{ChatConnector, OutboundPayload};
use drover_config::OutputFlags;
use drover_core::{MessageKind, SdkMessage};
use drover_engine::OnMessage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Which platform's message rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Platform {
    Discord,
    Slack,
}

impl Platform {
    fn split(&self, text: &str) -> Vec<String> {
        match self {
            Platform::Discord => split_with(text, 2000, 500, FenceMode::Preserve),
            Platform::Slack => split_with(text, 4000, 500, FenceMode::Ignore),
        }
    }
}

struct PendingTool {
    tool: ToolUse,
    started: Instant,
}

/// Routes one job's stream into one chat channel.
pub(crate) struct ReplyRouter {
    connector: Arc<dyn ChatConnector>,
    channel_id: String,
    output: OutputFlags,
    platform: Platform,
    chunk_delay: Duration,
    sent: AtomicBool,
    pending: Mutex<HashMap<String, PendingTool>>,
    session: Mutex<Option<String>>,
}

impl ReplyRouter {
    pub(crate) fn new(
        connector: Arc<dyn ChatConnector>,
        channel_id: impl Into<String>,
        output: OutputFlags,
        platform: Platform,
        chunk_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            connector,
            channel_id: channel_id.into(),
            output,
            platform,
            chunk_delay,
            sent: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
        })
    }

    /// The trigger `on_message` callback for this router.
    pub(crate) fn on_message(self: &Arc<Self>) -> OnMessage {
        let router = Arc::clone(self);
        Arc::new(move |message| {
            let router = Arc::clone(&router);
            Box::pin(async move {
                router.route(message).await;
            })
        })
    }

    /// Whether anything was sent into the channel.
    pub(crate) fn sent_any(&self) -> bool {
        self.sent.load(Ordering::SeqCst)
    }

    /// LLM session id observed on the stream, if any.
    pub(crate) fn session(&self) -> Option<String> {
        self.session.lock().clone()
    }

    async fn route(&self, message: SdkMessage) {
        if let Some(session_id) = message.session_id() {
            let mut session = self.session.lock();
            if session.is_none() {
                *session = Some(session_id.to_string());
            }
        }

        match message.kind() {
            MessageKind::Assistant => {
                if let Some(text) = extract_message_content(&message) {
                    self.send_text(&text).await;
                }
                for tool in extract_tool_use_blocks(&message) {
                    match tool.id.clone() {
                        Some(id) => {
                            self.pending.lock().insert(
                                id,
                                PendingTool {
                                    tool,
                                    started: Instant::now(),
                                },
                            );
                        }
                        None if self.output.tool_results => {
                            // No id to pair a result with: render immediately
                            self.send_embed(build_tool_embed(
                                &tool,
                                None,
                                None,
                                self.output.max_output_chars,
                            ))
                            .await;
                        }
                        None => {}
                    }
                }
            }
            MessageKind::User => {
                if !self.output.tool_results {
                    return;
                }
                for result in extract_tool_results(&message) {
                    let pending = result
                        .tool_use_id
                        .as_ref()
                        .and_then(|id| self.pending.lock().remove(id));
                    let (tool, duration_ms) = match pending {
                        Some(p) => (
                            p.tool,
                            Some(p.started.elapsed().as_millis() as u64),
                        ),
                        None => (
                            ToolUse {
                                id: result.tool_use_id.clone(),
                                name: "Tool".to_string(),
                                input: serde_json::Value::Null,
                            },
                            None,
                        ),
                    };
                    self.send_embed(build_tool_embed(
                        &tool,
                        Some(&result),
                        duration_ms,
                        self.output.max_output_chars,
                    ))
                    .await;
                }
            }
            MessageKind::System => {
                if self.output.system_status {
                    self.send_embed(build_status_embed(&message)).await;
                }
            }
            MessageKind::Result => {
                if self.output.result_summary {
                    self.send_embed(build_result_embed(&message)).await;
                }
            }
            MessageKind::Error => {
                if self.output.errors {
                    let text = message
                        .error_text()
                        .unwrap_or_else(|| "unknown error".to_string());
                    self.send_embed(build_error_embed(&text)).await;
                }
            }
            MessageKind::Other => {}
        }
    }

    /// Send text, split per the platform limit, with an inter-chunk delay
    /// to stay inside rate limits.
    pub(crate) async fn send_text(&self, text: &str) {
        let chunks = self.platform.split(text);
        let last = chunks.len().saturating_sub(1);
        for (index, chunk) in chunks.into_iter().enumerate() {
            if let Err(e) = self
                .connector
                .send(&self.channel_id, OutboundPayload::Text(chunk))
                .await
            {
                warn!(channel_id = %self.channel_id, error = %e, "chat send failed");
                return;
            }
            self.sent.store(true, Ordering::SeqCst);
            if index < last {
                tokio::time::sleep(self.chunk_delay).await;
            }
        }
    }

    async fn send_embed(&self, embed: drover_adapters::Embed) {
        if let Err(e) = self
            .connector
            .send(&self.channel_id, OutboundPayload::Embed(embed))
            .await
        {
            warn!(channel_id = %self.channel_id, error = %e, "chat embed send failed");
            return;
        }
        self.sent.store(true, Ordering::SeqCst);
    }
}
