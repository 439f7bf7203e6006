//! Concurrency caps across trigger sources, and runtime schedule toggles.

use crate::prelude::*;
use drover_adapters::ScriptStep;
use drover_engine::TriggerOptions;

const CAPPED_AGENT: &str = "name: agent-1\nmax_concurrent: 2\n";

#[tokio::test]
async fn cap_bounds_simultaneous_jobs() {
    let f = fleet(&[("agent-1", CAPPED_AGENT)]);
    for _ in 0..2 {
        f.llm.push_script(vec![ScriptStep::Hang]);
    }
    f.manager.initialize().await.unwrap();

    let first = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();
    let second = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();

    // Third and fourth hit the cap
    for _ in 0..2 {
        let err = f
            .manager
            .trigger("agent-1", None, TriggerOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "concurrency-limit");
    }
    assert_eq!(f.manager.get_fleet_status().active_jobs, 2);

    // Cancelling frees the slots for new work
    f.manager.cancel_job(&first.job_id).unwrap();
    f.manager.cancel_job(&second.job_id).unwrap();
    first.outcome().await;
    second.outcome().await;
    assert_eq!(f.manager.get_fleet_status().active_jobs, 0);

    let receipt = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();
    receipt.outcome().await;
}

#[tokio::test]
async fn bypass_ignores_the_cap() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.llm.push_script(vec![ScriptStep::Hang]);
    f.manager.initialize().await.unwrap();

    let blocker = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();

    let bypass = f
        .manager
        .trigger(
            "agent-1",
            None,
            TriggerOptions {
                bypass_concurrency_limit: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    bypass.outcome().await;

    f.manager.cancel_job(&blocker.job_id).unwrap();
    blocker.outcome().await;
}

#[tokio::test]
async fn disabled_schedule_never_fires_until_enabled() {
    let agent = r#"
name: agent-1
schedules:
  tick:
    interval: 100ms
"#;
    let f = fleet(&[("agent-1", agent)]);
    f.manager.initialize().await.unwrap();
    f.manager.disable_schedule("agent-1", "tick").unwrap();
    let events = record_events(&f);

    f.manager.start().await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    // Disabled schedules never appear in schedule:triggered
    assert!(!event_names(&events).contains(&"schedule:triggered".to_string()));
    assert!(event_names(&events).contains(&"schedule:skipped".to_string()));

    f.manager.enable_schedule("agent-1", "tick").unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert!(event_names(&events).contains(&"schedule:triggered".to_string()));

    f.manager
        .stop(drover_engine::StopOptions::default())
        .await
        .unwrap();
}
