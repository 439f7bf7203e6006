// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat connector surface.
//!
//! Connectors bridge a chat platform (Discord, Slack) to the fleet. The
//! real client libraries live behind [`ConnectorRegistry`] factories; a
//! registry with no factory for a platform is the "integration library
//! absent" case and managers skip that platform with a debug log.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from connector operations
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("disconnect failed: {0}")]
    DisconnectFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// One inbound chat message routed toward the fleet.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Target agent; set by per-agent connectors (Discord), `None` when
    /// routing happens in the manager (Slack channel map)
    pub agent: Option<String>,
    /// Message text, already stripped of the mention prefix
    pub prompt: String,
    pub channel_id: String,
    pub message_id: String,
    pub guild_id: Option<String>,
    pub user_id: String,
    pub username: String,
    pub was_mentioned: bool,
    /// Connector reply mode hint (e.g. "mention")
    pub mode: Option<String>,
}

/// Events a connector pushes to its manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(InboundMessage),
    Error { message: String },
}

/// A structured, titled message payload beyond plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

/// One field on an embed.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Outbound reply content.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    Text(String),
    Embed(Embed),
}

/// A chat platform endpoint.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    /// Open the connection and start pushing events to `events`.
    async fn connect(&self, events: mpsc::Sender<ChatEvent>) -> Result<(), ChatError>;

    /// Close the connection. Safe to call when not connected.
    async fn disconnect(&self) -> Result<(), ChatError>;

    /// Send a reply into a channel.
    async fn send(&self, channel_id: &str, payload: OutboundPayload) -> Result<(), ChatError>;

    /// Show a typing indicator in a channel.
    async fn start_typing(&self, channel_id: &str) -> Result<(), ChatError>;

    /// Clear the typing indicator.
    async fn stop_typing(&self, channel_id: &str) -> Result<(), ChatError>;
}

/// Everything a factory needs to build one connector.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub platform: String,
    /// Owning agent for per-agent connectors (Discord); `None` for the
    /// shared Slack connector
    pub agent: Option<String>,
    /// Resolved credentials, keyed by role (e.g. "bot_token", "app_token")
    pub tokens: HashMap<String, String>,
    /// Platform-specific settings passed through opaquely
    pub settings: serde_json::Value,
}

/// Factory producing a connector from its config.
pub type ConnectorFactory =
    Arc<dyn Fn(&ConnectorConfig) -> Result<Arc<dyn ChatConnector>, ChatError> + Send + Sync>;

/// Registry of connector factories keyed by platform name.
///
/// The configuration-driven stand-in for optional integration libraries:
/// platforms without a registered factory are skipped by their managers.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    factories: HashMap<String, ConnectorFactory>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a platform, replacing any previous one.
    pub fn register(&mut self, platform: impl Into<String>, factory: ConnectorFactory) {
        self.factories.insert(platform.into(), factory);
    }

    /// Check whether a platform has a factory.
    pub fn supports(&self, platform: &str) -> bool {
        self.factories.contains_key(platform)
    }

    /// Build a connector. `None` when the platform has no factory.
    pub fn create(
        &self,
        config: &ConnectorConfig,
    ) -> Option<Result<Arc<dyn ChatConnector>, ChatError>> {
        self.factories
            .get(&config.platform)
            .map(|factory| factory(config))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
