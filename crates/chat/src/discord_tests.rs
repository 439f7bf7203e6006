// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drover_adapters::{FakeConnector, FakeLlmAdapter, ScriptStep};
use drover_config::{ChatBindings, FleetMeta, OutputFlags, ResolvedAgent, ResolvedConfig};
use drover_core::{EventKind, FakeClock, SdkMessage, SequentialJobIdGen};
use drover_engine::{EventBus, FleetContext, JobTracker};
use drover_storage::JobStore;
use indexmap::IndexMap;
use parking_lot::Mutex as PlMutex;
use std::path::PathBuf;
use tempfile::TempDir;

const CHANNEL: &str = "C100";
const FAST_DELAY: Duration = Duration::from_millis(5);

fn discord_agent(name: &str, token_env: &str, output: OutputFlags) -> ResolvedAgent {
    ResolvedAgent {
        name: name.to_string(),
        model: "default".to_string(),
        working_dir: PathBuf::from("/tmp"),
        max_concurrent: 1,
        runtime: "sdk".to_string(),
        schedules: IndexMap::new(),
        chat: Some(ChatBindings {
            discord: Some(DiscordBinding {
                bot_token_env: token_env.to_string(),
                mode: None,
                output,
                session_expiry_hours: 24,
            }),
            slack: None,
        }),
        config_dir: PathBuf::from("/tmp"),
    }
}

struct Fixture {
    dir: TempDir,
    api: Arc<dyn FleetApi>,
    llm: FakeLlmAdapter,
    bus: EventBus,
    connector: FakeConnector,
    manager: DiscordManager,
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
        SequentialJobIdGen::new(),
        llm.clone(),
        clock,
    );
    let connector = FakeConnector::new();
    let manager =
        DiscordManager::new(connector.registry_for("discord")).with_chunk_delay(FAST_DELAY);
    Fixture {
        dir,
        api: Arc::new(ctx),
        llm,
        bus,
        connector,
        manager,
    }
}

fn inbound(prompt: &str) -> InboundMessage {
    InboundMessage {
        agent: None,
        prompt: prompt.to_string(),
        channel_id: CHANNEL.to_string(),
        message_id: "m1".to_string(),
        guild_id: Some("g1".to_string()),
        user_id: "u1".to_string(),
        username: "tester".to_string(),
        was_mentioned: true,
        mode: None,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}

#[tokio::test]
async fn empty_registry_initializes_to_a_noop_manager() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_NO_REGISTRY_TOKEN",
        OutputFlags::default(),
    )]);
    let manager = DiscordManager::new(drover_adapters::ConnectorRegistry::new());
    manager.initialize(Arc::clone(&f.api)).await;
    manager.start().await;
    manager.stop().await;
    assert!(!f.connector.is_connected());
}

#[tokio::test]
async fn missing_token_skips_the_agent() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_UNSET_TOKEN",
        OutputFlags::default(),
    )]);
    std::env::remove_var("DROVER_TEST_DISCORD_UNSET_TOKEN");
    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    assert!(!f.connector.is_connected());
}

#[tokio::test]
async fn routes_reply_and_persists_session() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_A",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_A", "token");

    let handled = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&handled);
    f.bus.on(EventKind::DiscordMessageHandled, move |event| {
        sink.lock().push(event.clone());
    });

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    assert!(f.connector.is_connected());

    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("hello agent")))
        .await;
    settle().await;

    // Assistant text from the default fake script reached the channel
    let texts = f.connector.texts_for(CHANNEL);
    assert_eq!(texts, ["All done."]);
    // Result summary rendered as an embed
    assert_eq!(f.connector.embeds_for(CHANNEL).len(), 1);

    // Prompt flowed into the trigger path
    assert_eq!(f.llm.calls()[0].prompt, "hello agent");

    // Session persisted for the channel
    let sessions = drover_storage::SessionStore::open(f.dir.path(), "agent-1").unwrap();
    assert_eq!(
        sessions.get(CHANNEL).unwrap().session_id,
        "fake-session-1"
    );

    // Typing indicator cycled
    let typing = f.connector.typing_transitions();
    assert_eq!(typing.first(), Some(&(CHANNEL.to_string(), true)));
    assert_eq!(typing.last(), Some(&(CHANNEL.to_string(), false)));

    // Handled event fired with the job id
    let events = handled.lock();
    assert_eq!(events.len(), 1);
    match &events[0] {
        drover_core::Event::DiscordMessageHandled {
            agent,
            channel_id,
            message_id,
            ..
        } => {
            assert_eq!(agent, "agent-1");
            assert_eq!(channel_id, CHANNEL);
            assert_eq!(message_id, "m1");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    f.manager.stop().await;
    assert!(!f.connector.is_connected());
}

#[tokio::test]
async fn existing_session_resumes_the_conversation() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_B",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_B", "token");

    let sessions = drover_storage::SessionStore::open(f.dir.path(), "agent-1").unwrap();
    sessions
        .put(
            CHANNEL,
            &drover_core::ChatSession::new("sess-prior", f.api.now_utc()),
        )
        .unwrap();

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("continue")))
        .await;
    settle().await;

    assert_eq!(f.llm.calls()[0].resume.as_deref(), Some("sess-prior"));
}

#[tokio::test]
async fn expired_session_starts_fresh() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_C",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_C", "token");

    let sessions = drover_storage::SessionStore::open(f.dir.path(), "agent-1").unwrap();
    let stale = f.api.now_utc() - chrono::Duration::hours(48);
    sessions
        .put(CHANNEL, &drover_core::ChatSession::new("sess-old", stale))
        .unwrap();

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("hi")))
        .await;
    settle().await;

    assert_eq!(f.llm.calls()[0].resume, None);
}

#[tokio::test]
async fn silent_job_gets_the_fallback_reply() {
    let muted = OutputFlags {
        tool_results: false,
        system_status: false,
        result_summary: false,
        errors: false,
        max_output_chars: 900,
    };
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_D",
        muted,
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_D", "token");
    // Only a session-init message: no assistant text, nothing rendered
    f.llm.push_script(vec![ScriptStep::Message(SdkMessage::from_value(
        serde_json::json!({"type": "system", "subtype": "init", "session_id": "s"}),
    ))]);

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("quiet task")))
        .await;
    settle().await;

    assert_eq!(f.connector.texts_for(CHANNEL), [FALLBACK_REPLY]);
}

#[tokio::test]
async fn trigger_failure_replies_with_error_text() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_E",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_E", "token");

    let errors = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    f.bus.on(EventKind::DiscordMessageError, move |event| {
        sink.lock().push(event.clone());
    });

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;

    // Occupy the agent's single slot so the chat trigger hits the cap
    f.llm.push_script(vec![ScriptStep::Hang]);
    let receipt = f
        .api
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();

    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("blocked")))
        .await;
    settle().await;

    let texts = f.connector.texts_for(CHANNEL);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("❌ **Error**"));
    assert!(texts[0].contains("/reset"));
    assert_eq!(errors.lock().len(), 1);

    // Cleanup the hung job
    drop(receipt);
}

#[tokio::test]
async fn unconfigured_agent_gets_explanatory_reply() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_F",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_F", "token");

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;

    let mut message = inbound("hello");
    message.agent = Some("ghost".to_string());
    f.connector
        .inject(drover_adapters::ChatEvent::Message(message))
        .await;
    settle().await;

    let texts = f.connector.texts_for(CHANNEL);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("not configured"));
    assert!(f.llm.calls().is_empty());
}

#[tokio::test]
async fn connector_errors_surface_on_the_bus() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_G",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_G", "token");

    let errors = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    f.bus.on(EventKind::DiscordError, move |event| {
        sink.lock().push(event.clone());
    });

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Error {
            message: "gateway reset".to_string(),
        })
        .await;
    settle().await;

    assert_eq!(errors.lock().len(), 1);
}

#[tokio::test]
async fn long_replies_are_split_into_ordered_chunks() {
    let f = fixture(vec![discord_agent(
        "agent-1",
        "DROVER_TEST_DISCORD_TOKEN_H",
        OutputFlags::default(),
    )]);
    std::env::set_var("DROVER_TEST_DISCORD_TOKEN_H", "token");

    let long_reply = "This is a line of text.\n".repeat(100);
    f.llm.push_script(vec![ScriptStep::Message(SdkMessage::assistant_text(
        long_reply.clone(),
    ))]);

    f.manager.initialize(Arc::clone(&f.api)).await;
    f.manager.start().await;
    f.connector
        .inject(drover_adapters::ChatEvent::Message(inbound("long")))
        .await;
    settle().await;

    let texts = f.connector.texts_for(CHANNEL);
    assert!(texts.len() >= 2);
    assert_eq!(texts.concat(), long_reply);
}
