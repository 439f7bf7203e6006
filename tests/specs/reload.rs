//! Config reload: change sets and rollback.

use crate::prelude::*;
use drover_core::{ChangeCategory, ChangeKind, Event};

#[tokio::test]
async fn reload_reports_added_agent() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.manager.initialize().await.unwrap();
    let events = record_events(&f);

    write_fleet(
        &f.dir,
        &[("agent-1", "name: agent-1\n"), ("agent-2", "name: agent-2\n")],
    );
    let changes = f.manager.reload().await.unwrap();

    assert!(changes.iter().any(|c| c.change == ChangeKind::Added
        && c.category == ChangeCategory::Agent
        && c.name == "agent-2"));

    let (agent_count, emitted_changes) = events
        .lock()
        .iter()
        .find_map(|e| match e {
            Event::ConfigReloaded {
                agent_count,
                changes,
                ..
            } => Some((*agent_count, changes.clone())),
            _ => None,
        })
        .unwrap();
    assert_eq!(agent_count, 2);
    assert_eq!(emitted_changes, changes);
}

#[tokio::test]
async fn invalid_reload_keeps_previous_config() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.manager.initialize().await.unwrap();
    let before = f.manager.get_config().unwrap();

    std::fs::write(f.dir.path().join("fleet.yaml"), "version: [nope\n").unwrap();
    assert!(f.manager.reload().await.is_err());

    // get_config returns the exact pre-reload config
    similar_asserts::assert_eq!(*before, *f.manager.get_config().unwrap());

    // And the fleet still triggers against the old config
    let receipt = f
        .manager
        .trigger("agent-1", None, drover_engine::TriggerOptions::default())
        .await
        .unwrap();
    receipt.outcome().await;
}

#[tokio::test]
async fn removed_agents_are_reported_and_dropped() {
    let f = fleet(&[
        ("agent-1", "name: agent-1\n"),
        ("agent-2", "name: agent-2\n"),
    ]);
    f.manager.initialize().await.unwrap();

    write_fleet(&f.dir, &[("agent-1", "name: agent-1\n")]);
    let changes = f.manager.reload().await.unwrap();
    assert!(changes
        .iter()
        .any(|c| c.change == ChangeKind::Removed && c.name == "agent-2"));

    let err = f
        .manager
        .trigger("agent-2", None, drover_engine::TriggerOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "agent-not-found");
}

#[tokio::test]
async fn in_flight_jobs_keep_their_config_snapshot() {
    let f = fleet(&[("agent-1", "name: agent-1\nmodel: original-model\n")]);
    f.llm.push_script(vec![
        drover_adapters::ScriptStep::Delay(std::time::Duration::from_millis(200)),
        drover_adapters::ScriptStep::Message(drover_core::SdkMessage::assistant_text("done")),
    ]);
    f.manager.initialize().await.unwrap();

    let receipt = f
        .manager
        .trigger("agent-1", None, drover_engine::TriggerOptions::default())
        .await
        .unwrap();

    // Reload mid-flight with a different model
    write_fleet(&f.dir, &[("agent-1", "name: agent-1\nmodel: new-model\n")]);
    f.manager.reload().await.unwrap();
    receipt.outcome().await;

    // The in-flight job ran with the captured config
    assert_eq!(f.llm.calls()[0].model, "original-model");
}
