// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slack chat manager: one shared connector, channel→agent routing.

use crate::reply::{Platform, ReplyRouter};
use crate::split::{split_with, FenceMode};
use async_trait::async_trait;
use drover_adapters::{
    ChatConnector, ChatEvent, ConnectorConfig, ConnectorRegistry, InboundMessage, OutboundPayload,
};
use drover_config::SlackBinding;
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

/// Slack's single-message character limit.
pub const SLACK_MESSAGE_LIMIT: usize = 4000;

/// Default pause between consecutive chunks of one reply.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(250);

/// Reply for channels with no routed agent.
pub const UNROUTED_REPLY: &str = "This channel is not properly configured.";

/// Split a reply into Slack-sized chunks (no fence rewriting).
pub fn split_message(text: &str) -> Vec<String> {
    split_with(text, SLACK_MESSAGE_LIMIT, 500, FenceMode::Ignore)
}

fn error_reply(message: &str) -> String {
    format!("❌ **Error**: {message}\n\nPlease try again or use /reset to start over.")
}

#[derive(Clone)]
struct SlackAgent {
    sessions: SessionStore,
    binding: SlackBinding,
}

#[derive(Default)]
struct SlackState {
    api: Option<Arc<dyn FleetApi>>,
    connector: Option<Arc<dyn ChatConnector>>,
    /// channel id → agent name; later-registered agents win overlaps
    channel_map: HashMap<String, String>,
    agents: HashMap<String, SlackAgent>,
    task: Option<JoinHandle<()>>,
    initialized: bool,
}

/// Manager for the fleet's Slack surface.
pub struct SlackManager {
    registry: ConnectorRegistry,
    chunk_delay: Duration,
    inner: Mutex<SlackState>,
}

impl SlackManager {
    pub fn new(registry: ConnectorRegistry) -> Self {
        Self {
            registry,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            inner: Mutex::new(SlackState::default()),
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

        let mut state = SlackState {
            api: Some(Arc::clone(&api)),
            initialized: true,
            ..Default::default()
        };

        if !self.registry.supports("slack") {
            debug!("slack integration not available; skipping manager");
            *self.inner.lock() = state;
            return;
        }

        let config = api.config();
        let mut tokens: Option<(String, String)> = None;

        for agent in &config.agents {
            let Some(binding) = agent.slack() else {
                continue;
            };

            // The shared connector authenticates with the first bound
            // agent's tokens.
            if tokens.is_none() {
                let bot = std::env::var(&binding.bot_token_env).ok().filter(|t| !t.is_empty());
                let app = std::env::var(&binding.app_token_env).ok().filter(|t| !t.is_empty());
                match (bot, app) {
                    (Some(bot), Some(app)) => tokens = Some((bot, app)),
                    (None, _) => {
                        warn!(env = %binding.bot_token_env, "missing Slack bot token");
                    }
                    (_, None) => {
                        warn!(env = %binding.app_token_env, "missing Slack app token");
                    }
                }
            }

            for channel_id in &binding.channels {
                if let Some(previous) =
                    state.channel_map.insert(channel_id.clone(), agent.name.clone())
                {
                    warn!(
                        channel_id = %channel_id,
                        previous = %previous,
                        winner = %agent.name,
                        "channel mapped to multiple agents; last registration wins"
                    );
                }
            }

            match SessionStore::open(api.state_dir(), &agent.name) {
                Ok(sessions) => {
                    let purged =
                        sessions.purge_expired(binding.session_expiry_hours, api.now_utc());
                    if purged > 0 {
                        debug!(agent = %agent.name, purged, "purged expired chat sessions");
                    }
                    state.agents.insert(
                        agent.name.clone(),
                        SlackAgent {
                            sessions,
                            binding: binding.clone(),
                        },
                    );
                }
                Err(e) => {
                    warn!(agent = %agent.name, error = %e, "failed to open session store");
                }
            }
        }

        if state.agents.is_empty() {
            *self.inner.lock() = state;
            return;
        }
        let Some((bot_token, app_token)) = tokens else {
            // Missing credentials: skip connector creation, stay clean
            *self.inner.lock() = state;
            return;
        };

        let connector_config = ConnectorConfig {
            platform: "slack".to_string(),
            agent: None,
            tokens: HashMap::from([
                ("bot_token".to_string(), bot_token),
                ("app_token".to_string(), app_token),
            ]),
            settings: json!({ "channels": state.channel_map.keys().collect::<Vec<_>>() }),
        };
        match self.registry.create(&connector_config) {
            Some(Ok(connector)) => state.connector = Some(connector),
            Some(Err(e)) => warn!(error = %e, "slack connector creation failed"),
            None => {}
        }

        info!(
            channels = state.channel_map.len(),
            agents = state.agents.len(),
            "slack manager initialized"
        );
        *self.inner.lock() = state;
    }

    async fn do_start(&self) {
        let (api, connector) = {
            let inner = self.inner.lock();
            (inner.api.clone(), inner.connector.clone())
        };
        let (Some(api), Some(connector)) = (api, connector) else {
            return;
        };

        let (tx, rx) = mpsc::channel(64);
        if let Err(e) = connector.connect(tx).await {
            warn!(error = %e, "slack connect failed");
            api.bus().emit(&Event::SlackError {
                message: e.to_string(),
            });
            return;
        }

        let manager_state = Arc::clone(&api);
        let chunk_delay = self.chunk_delay;
        let routing = {
            let inner = self.inner.lock();
            (inner.channel_map.clone(), inner.agents.clone())
        };
        let task = tokio::spawn(pump(manager_state, connector, routing, rx, chunk_delay));
        self.inner.lock().task = Some(task);
    }

    async fn do_stop(&self) {
        let (connector, agents, task) = {
            let mut inner = self.inner.lock();
            (
                inner.connector.clone(),
                inner.agents.clone(),
                inner.task.take(),
            )
        };

        for (agent_name, agent) in &agents {
            debug!(
                agent = %agent_name,
                sessions = agent.sessions.count(),
                "sessions cached at disconnect"
            );
        }
        if let Some(connector) = connector {
            if let Err(e) = connector.disconnect().await {
                warn!(error = %e, "slack disconnect failed");
            }
        }
        if let Some(task) = task {
            task.abort();
        }
    }
}

#[async_trait]
impl ChatManagerHandle for SlackManager {
    fn name(&self) -> &str {
        "slack"
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

async fn pump(
    api: Arc<dyn FleetApi>,
    connector: Arc<dyn ChatConnector>,
    routing: (HashMap<String, String>, HashMap<String, SlackAgent>),
    mut rx: mpsc::Receiver<ChatEvent>,
    chunk_delay: Duration,
) {
    let (channel_map, agents) = routing;
    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Message(inbound) => {
                let routed = inbound
                    .agent
                    .clone()
                    .or_else(|| channel_map.get(&inbound.channel_id).cloned());
                let Some(agent_name) = routed else {
                    warn!(channel_id = %inbound.channel_id, "message from unrouted channel");
                    if let Err(e) = connector
                        .send(
                            &inbound.channel_id,
                            OutboundPayload::Text(UNROUTED_REPLY.to_string()),
                        )
                        .await
                    {
                        warn!(channel_id = %inbound.channel_id, error = %e, "failed to send unrouted reply");
                    }
                    api.bus().emit(&Event::SlackError {
                        message: format!(
                            "no agent configured for channel {}",
                            inbound.channel_id
                        ),
                    });
                    continue;
                };
                let Some(agent) = agents.get(&agent_name).cloned() else {
                    continue;
                };

                let api = Arc::clone(&api);
                let connector = Arc::clone(&connector);
                tokio::spawn(async move {
                    handle_message(api, connector, agent_name, agent, inbound, chunk_delay).await;
                });
            }
            ChatEvent::Error { message } => {
                error!(error = %message, "slack connector error");
                api.bus().emit(&Event::SlackError { message });
            }
        }
    }
}

async fn handle_message(
    api: Arc<dyn FleetApi>,
    connector: Arc<dyn ChatConnector>,
    agent_name: String,
    agent: SlackAgent,
    inbound: InboundMessage,
    chunk_delay: Duration,
) {
    let channel_id = inbound.channel_id.clone();

    if api.config().agent(&agent_name).is_none() {
        error!(agent = %agent_name, channel_id = %channel_id, "message for unconfigured agent");
        let _ = connector
            .send(&channel_id, OutboundPayload::Text(UNROUTED_REPLY.to_string()))
            .await;
        api.bus().emit(&Event::SlackMessageError {
            agent: agent_name,
            channel_id,
            message_id: inbound.message_id,
            error: "agent not configured".to_string(),
        });
        return;
    }

    let now = api.now_utc();
    let resume = agent
        .sessions
        .get(&channel_id)
        .filter(|session| !session.is_expired(agent.binding.session_expiry_hours, now))
        .map(|session| session.session_id);

    let _ = connector.start_typing(&channel_id).await;

    let router = ReplyRouter::new(
        Arc::clone(&connector),
        channel_id.clone(),
        agent.binding.output.clone(),
        Platform::Slack,
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
            let _ = connector
                .send(&channel_id, OutboundPayload::Text(error_reply(&e.to_string())))
                .await;
            let _ = connector.stop_typing(&channel_id).await;
            api.bus().emit(&Event::SlackMessageError {
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
    let _ = connector.stop_typing(&channel_id).await;

    match &outcome {
        JobOutcome::Completed => {
            if !router.sent_any() {
                let _ = connector
                    .send(
                        &channel_id,
                        OutboundPayload::Text(crate::discord::FALLBACK_REPLY.to_string()),
                    )
                    .await;
            }
        }
        JobOutcome::Failed(error) => {
            if !router.sent_any() {
                let _ = connector
                    .send(&channel_id, OutboundPayload::Text(error_reply(error)))
                    .await;
            }
        }
        JobOutcome::Cancelled => {}
    }

    if let Some(session_id) = router.session() {
        let session = ChatSession::new(session_id, api.now_utc());
        if let Err(e) = agent.sessions.put(&channel_id, &session) {
            warn!(agent = %agent_name, error = %e, "failed to persist chat session");
        }
    }

    api.bus().emit(&Event::SlackMessageHandled {
        agent: agent_name,
        channel_id,
        message_id: inbound.message_id,
        job_id,
    });
}

#[cfg(test)]
#[path = "slack_tests.rs"]
mod tests;
