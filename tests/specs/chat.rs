//! Chat bridging: inbound messages trigger jobs, replies stream back.

use crate::prelude::*;
use drover_adapters::{ChatEvent, FakeConnector, InboundMessage};
use drover_chat::{split_response, DiscordManager};
use drover_core::EventKind;
use drover_engine::{ChatManagerHandle, StopOptions};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const DISCORD_AGENT: &str = r#"
name: chat-agent
chat:
  discord:
    bot_token_env: DROVER_SPEC_DISCORD_TOKEN
"#;

fn inbound(prompt: &str) -> InboundMessage {
    InboundMessage {
        agent: None,
        prompt: prompt.to_string(),
        channel_id: "C42".to_string(),
        message_id: "m42".to_string(),
        guild_id: Some("g1".to_string()),
        user_id: "u1".to_string(),
        username: "spec".to_string(),
        was_mentioned: true,
        mode: None,
    }
}

#[tokio::test]
async fn discord_message_round_trip() {
    std::env::set_var("DROVER_SPEC_DISCORD_TOKEN", "token");
    let connector = FakeConnector::new();
    let discord = Arc::new(
        DiscordManager::new(connector.registry_for("discord"))
            .with_chunk_delay(Duration::from_millis(5)),
    );

    let base = fleet(&[("chat-agent", DISCORD_AGENT)]);
    let manager = drover_engine::FleetManager::with_clock(
        base.dir.path().join("fleet.yaml"),
        base.dir.path().join("state"),
        base.llm.clone(),
        base.clock.clone(),
    )
    .with_check_interval(FAST_CHECK)
    .with_chat_manager(discord as Arc<dyn ChatManagerHandle>);

    let handled = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&handled);
    manager.bus().on(EventKind::DiscordMessageHandled, move |_| {
        *sink.lock() += 1;
    });

    manager.initialize().await.unwrap();
    manager.start().await.unwrap();
    assert!(connector.is_connected());

    connector
        .inject(ChatEvent::Message(inbound("hello from discord")))
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The assistant reply streamed back into the channel
    assert_eq!(connector.texts_for("C42"), ["All done."]);
    // The prompt reached the LLM through the trigger path
    assert_eq!(base.llm.calls()[0].prompt, "hello from discord");
    assert_eq!(*handled.lock(), 1);

    manager.stop(StopOptions::default()).await.unwrap();
    assert!(!connector.is_connected());
}

#[test]
fn split_response_honors_the_contract() {
    // The splitting contract, exercised through the public API
    assert_eq!(split_response(""), [""]);
    let exactly = "y".repeat(2000);
    assert_eq!(split_response(&exactly), [exactly.clone()]);

    let long = "This is a line of text.\n".repeat(100);
    let chunks = split_response(&long);
    assert!(chunks.len() >= 2);
    assert!(chunks.iter().all(|c| c.chars().count() <= 2000));
    assert_eq!(chunks.concat(), long);
}
