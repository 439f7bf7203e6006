// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_adapters::{FakeConnector, FakeLlmAdapter};
use drover_config::{ChatBindings, FleetMeta, OutputFlags, ResolvedAgent, ResolvedConfig};
use drover_core::{EventKind, FakeClock};
use drover_engine::{EventBus, FleetContext, JobTracker};
use drover_storage::JobStore;
use indexmap::IndexMap;
use parking_lot::Mutex as PlMutex;
use std::path::PathBuf;
use tempfile::TempDir;

const FAST_DELAY: Duration = Duration::from_millis(5);

fn slack_agent(name: &str, channels: &[&str], bot_env: &str, app_env: &str) -> ResolvedAgent {
    ResolvedAgent {
        name: name.to_string(),
        model: "default".to_string(),
        working_dir: PathBuf::from("/tmp"),
        max_concurrent: 1,
        runtime: "sdk".to_string(),
        schedules: IndexMap::new(),
        chat: Some(ChatBindings {
            discord: None,
            slack: Some(SlackBinding {
                bot_token_env: bot_env.to_string(),
                app_token_env: app_env.to_string(),
                channels: channels.iter().map(|c| c.to_string()).collect(),
                output: OutputFlags::default(),
                session_expiry_hours: 24,
            }),
        }),
        config_dir: PathBuf::from("/tmp"),
    }
}

struct Fixture {
    _dir: TempDir,
    api: Arc<dyn FleetApi>,
    llm: FakeLlmAdapter,
    bus: EventBus,
    connector: FakeConnector,
    manager: SlackManager,
}

fn fixture(agents: Vec<ResolvedAgent>) -> Fixture {
    let dir = TempDir::new().unwrap();
    let bus = EventBus::new();
    let llm = FakeLlmAdapter::new();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_773_478_800_000);
    let jobs = JobStore::open(dir.path()).unwrap();
    let config = Arc::new(ResolvedConfig {
        fleet: FleetMeta::default(),
        agents,
        config_path: PathBuf::from("/tmp/fleet.yaml"),
        config_dir: PathBuf::from("/tmp"),
        content_hash: "test".to_string(),
    });
    let ctx = FleetContext::new(
        config,
        dir.path().to_path_buf(),
        bus.clone(),
        jobs,
        JobTracker::new(),
        drover_core::SequentialJobIdGen::new(),
        llm.clone(),
        clock,
    );
    let connector = FakeConnector::new();
    let manager = SlackManager::new(connector.registry_for("slack")).with_chunk_delay(FAST_DELAY);
    Fixture {
        _dir: dir,
        api: Arc::new(ctx),
        llm,
        bus,
        connector,
        manager,
    }
}

fn inbound(channel_id: &str, prompt: &str) -> InboundMessage {
    InboundMessage {
        agent: None,
        prompt: prompt.to_string(),
        channel_id: channel_id.to_string(),
        message_id: "s1".to_string(),
        guild_id: None,
        user_id: "u1".to_string(),
        username: "tester".to_string(),
        was_mentioned: false,
        mode: None,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

fn set_tokens(bot_env: &str, app_env: &str) {
    std::env::set_var(bot_env, "xoxb-test");
    std::env::set_var(app_env, "xapp-test");
}

#[tokio::test]
async fn routes_by_channel_map() {
    set_tokens("DROVER_TEST_SLACK_BOT_A", "DROVER_TEST_SLACK_APP_A");
    let f = fixture(vec![
        slack_agent("agent-1", &["C1"], "DROVER_TEST_SLACK_BOT_A", "DROVER_TEST_SLACK_APP_A"),
        slack_agent("agent-2", &["C2"], "DROVER_TEST_SLACK_BOT_A", "DROVER_TEST_SLACK_APP_A"),
    ]);

    let handled = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&handled);
    f.bus.on(EventKind::SlackMessageHandled, move |event| {
        sink.lock().push(event.clone());
    });

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    assert!(f.connector.is_connected());

    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("C2", "for agent two")))
        .await;
    settle().await;

    assert_eq!(f.connector.texts_for("C2"), ["All done."]);
    assert_eq!(f.llm.calls()[0].prompt, "for agent two");
    match &handled.lock()[0] {
        drover_core::Event::SlackMessageHandled { agent, channel_id, .. } => {
            assert_eq!(agent, "agent-2");
            assert_eq!(channel_id, "C2");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    f.manager.stop().await;
    assert!(!f.connector.is_connected());
}

#[tokio::test]
async fn unrouted_channel_gets_not_configured_reply() {
    set_tokens("DROVER_TEST_SLACK_BOT_B", "DROVER_TEST_SLACK_APP_B");
    let f = fixture(vec![slack_agent(
        "agent-1",
        &["C1"],
        "DROVER_TEST_SLACK_BOT_B",
        "DROVER_TEST_SLACK_APP_B",
    )]);

    let errors = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    f.bus.on(EventKind::SlackError, move |event| {
        sink.lock().push(event.clone());
    });

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("C9", "hello?")))
        .await;
    settle().await;

    assert_eq!(f.connector.texts_for("C9"), [UNROUTED_REPLY]);
    assert!(f.llm.calls().is_empty());
    assert_eq!(errors.lock().len(), 1);
}

#[tokio::test]
async fn overlapping_channels_last_registration_wins() {
    set_tokens("DROVER_TEST_SLACK_BOT_C", "DROVER_TEST_SLACK_APP_C");
    let f = fixture(vec![
        slack_agent("agent-1", &["C1"], "DROVER_TEST_SLACK_BOT_C", "DROVER_TEST_SLACK_APP_C"),
        slack_agent("agent-2", &["C1"], "DROVER_TEST_SLACK_BOT_C", "DROVER_TEST_SLACK_APP_C"),
    ]);

    let handled = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&handled);
    f.bus.on(EventKind::SlackMessageHandled, move |event| {
        sink.lock().push(event.clone());
    });

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("C1", "who gets this?")))
        .await;
    settle().await;

    let guard = handled.lock();
    match &guard[0] {
        drover_core::Event::SlackMessageHandled { agent, .. } => assert_eq!(agent, "agent-2"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn missing_app_token_skips_connector_creation() {
    std::env::set_var("DROVER_TEST_SLACK_BOT_D", "xoxb-test");
    std::env::remove_var("DROVER_TEST_SLACK_APP_D");
    let f = fixture(vec![slack_agent(
        "agent-1",
        &["C1"],
        "DROVER_TEST_SLACK_BOT_D",
        "DROVER_TEST_SLACK_APP_D",
    )]);

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    assert!(!f.connector.is_connected());

    // Idempotent: a second initialize is a clean no-op
    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.stop().await;
}

#[tokio::test]
async fn session_continuity_per_agent() {
    set_tokens("DROVER_TEST_SLACK_BOT_E", "DROVER_TEST_SLACK_APP_E");
    let f = fixture(vec![slack_agent(
        "agent-1",
        &["C1"],
        "DROVER_TEST_SLACK_BOT_E",
        "DROVER_TEST_SLACK_APP_E",
    )]);

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;

    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("C1", "first")))
        .await;
    settle().await;

    // Session recorded from the first exchange feeds the second
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("C1", "second")))
        .await;
    settle().await;

    let calls = f.llm.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].resume, None);
    assert_eq!(calls[1].resume.as_deref(), Some("fake-session-1"));
}
