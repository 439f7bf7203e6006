//! Fleet lifecycle: initialize, start, trigger, stop.

use crate::prelude::*;
use drover_core::{Event, TriggerKind};
use drover_engine::{ManagerState, StopOptions, TriggerOptions};

const WORKFLOW_AGENT: &str = r#"
name: workflow-agent
model: default
schedules:
  hourly:
    type: interval
    interval: 1h
    prompt: Check hourly tasks
    enabled: false
"#;

#[tokio::test]
async fn full_lifecycle() {
    let f = fleet(&[("workflow-agent", WORKFLOW_AGENT)]);
    let events = record_events(&f);

    f.manager.initialize().await.unwrap();
    f.manager.start().await.unwrap();
    assert_eq!(f.manager.get_fleet_status().state, "running");

    let receipt = f
        .manager
        .trigger("workflow-agent", Some("hourly"), TriggerOptions::default())
        .await
        .unwrap();
    assert_eq!(receipt.agent, "workflow-agent");
    assert_eq!(receipt.schedule.as_deref(), Some("hourly"));
    assert_eq!(receipt.prompt, "Check hourly tasks");
    receipt.outcome().await;

    let created = events
        .lock()
        .iter()
        .find_map(|e| match e {
            Event::JobCreated { job } => Some(job.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(created.trigger, TriggerKind::Manual);
    assert_eq!(created.schedule.as_deref(), Some("hourly"));
    assert_eq!(created.prompt, "Check hourly tasks");

    f.manager.stop(StopOptions::default()).await.unwrap();
    assert_eq!(f.manager.get_fleet_status().state, "stopped");
}

#[tokio::test]
async fn duplicate_agent_names_are_fatal() {
    let f = fleet(&[
        ("first", "name: duplicate-name\n"),
        ("second", "name: duplicate-name\n"),
    ]);

    let err = f.manager.initialize().await.unwrap_err();
    assert_eq!(err.code(), "configuration");
    assert!(err.to_string().contains("duplicate-name"));
    assert_eq!(f.manager.state(), ManagerState::Error);
}

#[tokio::test]
async fn job_ids_match_the_contract() {
    // Ids from the real store are unique and well-shaped
    let f = fleet(&[("agent-1", "name: agent-1\nmax_concurrent: 10\n")]);
    f.manager.initialize().await.unwrap();

    let mut ids = std::collections::HashSet::new();
    for _ in 0..10 {
        let receipt = f
            .manager
            .trigger("agent-1", None, TriggerOptions::default())
            .await
            .unwrap();
        let id = receipt.job_id.to_string();
        receipt.outcome().await;

        assert!(ids.insert(id.clone()), "duplicate id {id}");
        let parts: Vec<&str> = id.splitn(2, '-').collect();
        assert_eq!(parts[0], "job");
        let rest = parts[1]; // YYYY-MM-DD-xxxxxx
        assert_eq!(rest.len(), "2026-03-14-abc123".len());
        assert_eq!(&rest[..10], "2026-03-14");
        let suffix = &rest[11..];
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}

#[tokio::test]
async fn events_are_ordered_created_output_terminal() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.manager.initialize().await.unwrap();
    let events = record_events(&f);

    let receipt = f
        .manager
        .trigger("agent-1", None, TriggerOptions::default())
        .await
        .unwrap();
    receipt.outcome().await;

    let names = event_names(&events);
    let created = names.iter().position(|n| n == "job:created").unwrap();
    let first_output = names.iter().position(|n| n == "job:output").unwrap();
    let completed = names.iter().position(|n| n == "job:completed").unwrap();
    assert!(created < first_output);
    assert!(first_output < completed);
}
