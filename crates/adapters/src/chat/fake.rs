// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake chat connector for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]
#![allow(clippy::panic)]

use super::{
    ChatConnector, ChatError, ChatEvent, ConnectorConfig, ConnectorRegistry, Embed,
    OutboundPayload,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One payload sent through the fake connector.
#[derive(Debug, Clone, PartialEq)]
pub enum SentPayload {
    Text { channel_id: String, text: String },
    Embed { channel_id: String, embed: Embed },
}

struct FakeConnectorState {
    events: Option<mpsc::Sender<ChatEvent>>,
    sent: Vec<SentPayload>,
    typing: Vec<(String, bool)>,
    connected: bool,
    connect_error: Option<String>,
    disconnect_error: Option<String>,
    send_error: Option<String>,
}

/// Fake chat connector
///
/// Records outbound traffic, lets tests inject inbound events, and can be
/// scripted to fail on connect/disconnect/send.
#[derive(Clone)]
pub struct FakeConnector {
    inner: Arc<Mutex<FakeConnectorState>>,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeConnectorState {
                events: None,
                sent: Vec::new(),
                typing: Vec::new(),
                connected: false,
                connect_error: None,
                disconnect_error: None,
                send_error: None,
            })),
        }
    }

    /// A registry that produces this connector for the given platform.
    pub fn registry_for(&self, platform: &str) -> ConnectorRegistry {
        let mut registry = ConnectorRegistry::new();
        let connector = self.clone();
        registry.register(
            platform,
            Arc::new(move |_config: &ConnectorConfig| {
                Ok(Arc::new(connector.clone()) as Arc<dyn ChatConnector>)
            }),
        );
        registry
    }

    /// Inject an inbound event as if the platform delivered it.
    ///
    /// Panics if the connector was never connected.
    pub async fn inject(&self, event: ChatEvent) {
        let tx = self
            .inner
            .lock()
            .events
            .clone()
            .unwrap_or_else(|| panic!("fake connector not connected"));
        let _ = tx.send(event).await;
    }

    pub fn sent(&self) -> Vec<SentPayload> {
        self.inner.lock().sent.clone()
    }

    /// Texts sent to one channel, in order.
    pub fn texts_for(&self, channel_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter_map(|payload| match payload {
                SentPayload::Text { channel_id: c, text } if c == channel_id => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Embeds sent to one channel, in order.
    pub fn embeds_for(&self, channel_id: &str) -> Vec<Embed> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter_map(|payload| match payload {
                SentPayload::Embed { channel_id: c, embed } if c == channel_id => {
                    Some(embed.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    /// Typing indicator transitions as (channel, on) pairs.
    pub fn typing_transitions(&self) -> Vec<(String, bool)> {
        self.inner.lock().typing.clone()
    }

    pub fn set_connect_error(&self, message: impl Into<String>) {
        self.inner.lock().connect_error = Some(message.into());
    }

    pub fn set_disconnect_error(&self, message: impl Into<String>) {
        self.inner.lock().disconnect_error = Some(message.into());
    }

    pub fn set_send_error(&self, message: impl Into<String>) {
        self.inner.lock().send_error = Some(message.into());
    }
}

#[async_trait]
impl ChatConnector for FakeConnector {
    async fn connect(&self, events: mpsc::Sender<ChatEvent>) -> Result<(), ChatError> {
        let mut state = self.inner.lock();
        if let Some(message) = state.connect_error.take() {
            return Err(ChatError::ConnectFailed(message));
        }
        state.events = Some(events);
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ChatError> {
        let mut state = self.inner.lock();
        state.connected = false;
        state.events = None;
        if let Some(message) = state.disconnect_error.take() {
            return Err(ChatError::DisconnectFailed(message));
        }
        Ok(())
    }

    async fn send(&self, channel_id: &str, payload: OutboundPayload) -> Result<(), ChatError> {
        let mut state = self.inner.lock();
        if let Some(message) = state.send_error.take() {
            return Err(ChatError::SendFailed(message));
        }
        state.sent.push(match payload {
            OutboundPayload::Text(text) => SentPayload::Text {
                channel_id: channel_id.to_string(),
                text,
            },
            OutboundPayload::Embed(embed) => SentPayload::Embed {
                channel_id: channel_id.to_string(),
                embed,
            },
        });
        Ok(())
    }

    async fn start_typing(&self, channel_id: &str) -> Result<(), ChatError> {
        self.inner.lock().typing.push((channel_id.to_string(), true));
        Ok(())
    }

    async fn stop_typing(&self, channel_id: &str) -> Result<(), ChatError> {
        self.inner
            .lock()
            .typing
            .push((channel_id.to_string(), false));
        Ok(())
    }
}
