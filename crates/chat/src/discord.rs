// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discord chat manager: one connector per bound agent.

use crate::reply::{Platform, ReplyRouter};
use crate::split::{split_with, FenceMode};
use async_trait::async_trait;
use drover_adapters::{
    ChatConnector, ChatEvent, ConnectorConfig, ConnectorRegistry, InboundMessage, OutboundPayload,
};
use drover_config::DiscordBinding;
use drover_core::{ChatSession, Event, TriggerKind};
use drover_engine::{ChatManagerHandle, FleetApi, JobOutcome, TriggerOptions};
use drover_storage::SessionStore;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Discord's single-message character limit.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Default pause between consecutive chunks of one reply.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(250);

/// Reply when a job finishes without producing any channel output.
pub const FALLBACK_REPLY: &str =
    "I've completed the task, but I don't have a specific response to share.";

/// Split a reply into Discord-sized chunks.
///
/// Greedy, boundary-preferring (paragraph break > newline > space within
/// the last 500 chars before the limit), with code fences closed and
/// reopened across chunk boundaries.
pub fn split_response(text: &str) -> Vec<String> {
    split_with(text, DISCORD_MESSAGE_LIMIT, 500, FenceMode::Preserve)
}

fn error_reply(message: &str) -> String {
    format!("❌ **Error**: {message}\n\nPlease try again or use /reset to start over.")
}

#[derive(Clone)]
struct AgentChannel {
    connector: Arc<dyn ChatConnector>,
    sessions: SessionStore,
    binding: DiscordBinding,
}

#[derive(Default)]
struct DiscordState {
    api: Option<Arc<dyn FleetApi>>,
    agents: HashMap<String, AgentChannel>,
    tasks: Vec<JoinHandle<()>>,
    initialized: bool,
}

/// Manager for the fleet's Discord surface.
pub struct DiscordManager {
    registry: ConnectorRegistry,
    chunk_delay: Duration,
    inner: Mutex<DiscordState>,
}

impl DiscordManager {
    pub fn new(registry: ConnectorRegistry) -> Self {
        Self {
            registry,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            inner: Mutex::new(DiscordState::default()),
        }
    }

    /// Override the inter-chunk delay (tests).
    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }

    async fn do_initialize(&self, api: Arc<dyn FleetApi>) {
        if self.inner.lock().initialized {
            return;
        }

        if !self.registry.supports("discord") {
            debug!("discord integration not available; skipping manager");
            let mut inner = self.inner.lock();
            inner.api = Some(api);
            inner.initialized = true;
            return;
        }

        let config = api.config();
        let mut agents = HashMap::new();
        for agent in &config.agents {
            let Some(binding) = agent.discord() else {
                continue;
            };

            let token = match std::env::var(&binding.bot_token_env) {
                Ok(token) if !token.is_empty() => token,
                _ => {
                    warn!(
                        agent = %agent.name,
                        env = %binding.bot_token_env,
                        "missing Discord bot token; skipping agent"
                    );
                    continue;
                }
            };

            let connector_config = ConnectorConfig {
                platform: "discord".to_string(),
                agent: Some(agent.name.clone()),
                tokens: HashMap::from([("bot_token".to_string(), token)]),
                settings: json!({ "mode": binding.mode }),
            };
            let connector = match self.registry.create(&connector_config) {
                Some(Ok(connector)) => connector,
                Some(Err(e)) => {
                    warn!(agent = %agent.name, error = %e, "discord connector creation failed");
                    continue;
                }
                None => continue,
            };

            let sessions = match SessionStore::open(api.state_dir(), &agent.name) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(agent = %agent.name, error = %e, "failed to open session store");
                    continue;
                }
            };
            let purged = sessions.purge_expired(binding.session_expiry_hours, api.now_utc());
            if purged > 0 {
                debug!(agent = %agent.name, purged, "purged expired chat sessions");
            }

            agents.insert(
                agent.name.clone(),
                AgentChannel {
                    connector,
                    sessions,
                    binding: binding.clone(),
                },
            );
        }

        info!(connectors = agents.len(), "discord manager initialized");
        let mut inner = self.inner.lock();
        inner.api = Some(api);
        inner.agents = agents;
        inner.initialized = true;
    }

    async fn do_start(&self) {
        let (api, agents) = {
            let inner = self.inner.lock();
            (inner.api.clone(), inner.agents.clone())
        };
        let Some(api) = api else {
            return;
        };

        for (agent_name, channel) in agents {
            let (tx, rx) = mpsc::channel(64);
            if let Err(e) = channel.connector.connect(tx).await {
                warn!(agent = %agent_name, error = %e, "discord connect failed");
                api.bus().emit(&Event::DiscordError {
                    agent: agent_name.clone(),
                    message: e.to_string(),
                });
                continue;
            }
            let task = tokio::spawn(pump(
                Arc::clone(&api),
                agent_name,
                channel,
                rx,
                self.chunk_delay,
            ));
            self.inner.lock().tasks.push(task);
        }
    }

    async fn do_stop(&self) {
        let (agents, tasks) = {
            let mut inner = self.inner.lock();
            (inner.agents.clone(), std::mem::take(&mut inner.tasks))
        };

        for (agent_name, channel) in &agents {
            debug!(
                agent = %agent_name,
                sessions = channel.sessions.count(),
                "sessions cached at disconnect"
            );
            if let Err(e) = channel.connector.disconnect().await {
                warn!(agent = %agent_name, error = %e, "discord disconnect failed");
            }
        }
        for task in tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl ChatManagerHandle for DiscordManager {
    fn name(&self) -> &str {
        "discord"
    }

    async fn initialize(&self, api: Arc<dyn FleetApi>) {
        self.do_initialize(api).await;
    }

    async fn start(&self) {
        self.do_start().await;
    }

    async fn stop(&self) {
        self.do_stop().await;
    }
}

/// Per-connector event pump. Each inbound message is handled on its own
/// task so one slow job doesn't block the channel.
async fn pump(
    api: Arc<dyn FleetApi>,
    agent_name: String,
    channel: AgentChannel,
    mut rx: mpsc::Receiver<ChatEvent>,
    chunk_delay: Duration,
) {
    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Message(inbound) => {
                let api = Arc::clone(&api);
                let channel = channel.clone();
                let agent = inbound.agent.clone().unwrap_or_else(|| agent_name.clone());
                tokio::spawn(async move {
                    handle_message(api, agent, channel, inbound, chunk_delay).await;
                });
            }
            ChatEvent::Error { message } => {
                error!(agent = %agent_name, error = %message, "discord connector error");
                api.bus().emit(&Event::DiscordError {
                    agent: agent_name.clone(),
                    message,
                });
            }
        }
    }
}

async fn handle_message(
    api: Arc<dyn FleetApi>,
    agent_name: String,
    channel: AgentChannel,
    inbound: InboundMessage,
    chunk_delay: Duration,
) {
    let channel_id = inbound.channel_id.clone();

    if api.config().agent(&agent_name).is_none() {
        error!(agent = %agent_name, channel_id = %channel_id, "message for unconfigured agent");
        let reply = format!("Agent `{agent_name}` is not configured.");
        if let Err(e) = channel
            .connector
            .send(&channel_id, OutboundPayload::Text(reply))
            .await
        {
            warn!(channel_id = %channel_id, error = %e, "failed to send not-configured reply");
        }
        api.bus().emit(&Event::DiscordMessageError {
            agent: agent_name,
            channel_id,
            message_id: inbound.message_id,
            error: "agent not configured".to_string(),
        });
        return;
    }

    let now = api.now_utc();
    let resume = channel
        .sessions
        .get(&channel_id)
        .filter(|session| !session.is_expired(channel.binding.session_expiry_hours, now))
        .map(|session| session.session_id);

    let _ = channel.connector.start_typing(&channel_id).await;

    let router = ReplyRouter::new(
        Arc::clone(&channel.connector),
        channel_id.clone(),
        channel.binding.output.clone(),
        Platform::Discord,
        chunk_delay,
    );
    let options = TriggerOptions {
        prompt: Some(inbound.prompt.clone()),
        resume,
        on_message: Some(router.on_message()),
        trigger: Some(TriggerKind::Chat),
        ..Default::default()
    };

    let receipt = match api.trigger(&agent_name, None, options).await {
        Ok(receipt) => receipt,
        Err(e) => {
            warn!(agent = %agent_name, error = %e, "chat trigger failed");
            if let Err(send_err) = channel
                .connector
                .send(&channel_id, OutboundPayload::Text(error_reply(&e.to_string())))
                .await
            {
                warn!(channel_id = %channel_id, error = %send_err, "failed to send error reply");
            }
            let _ = channel.connector.stop_typing(&channel_id).await;
            api.bus().emit(&Event::DiscordMessageError {
                agent: agent_name,
                channel_id,
                message_id: inbound.message_id,
                error: e.to_string(),
            });
            return;
        }
    };

    let job_id = receipt.job_id.clone();
    let outcome = receipt.outcome().await;
    let _ = channel.connector.stop_typing(&channel_id).await;

    match &outcome {
        JobOutcome::Completed => {
            if !router.sent_any() {
                let _ = channel
                    .connector
                    .send(&channel_id, OutboundPayload::Text(FALLBACK_REPLY.to_string()))
                    .await;
            }
        }
        JobOutcome::Failed(error) => {
            if !router.sent_any() {
                let _ = channel
                    .connector
                    .send(&channel_id, OutboundPayload::Text(error_reply(error)))
                    .await;
            }
        }
        JobOutcome::Cancelled => {}
    }

    if let Some(session_id) = router.session() {
        let session = ChatSession::new(session_id, api.now_utc());
        if let Err(e) = channel.sessions.put(&channel_id, &session) {
            warn!(agent = %agent_name, error = %e, "failed to persist chat session");
        }
    }

    api.bus().emit(&Event::DiscordMessageHandled {
        agent: agent_name,
        channel_id,
        message_id: inbound.message_id,
        job_id,
    });
}

#[cfg(test)]
#[path = "discord_tests.rs"]
mod tests;
