//! Retention deletes strictly the oldest jobs.

use crate::prelude::*;
use drover_engine::TriggerOptions;
use drover_storage::{JobStore, RetentionPolicy};

#[tokio::test]
async fn keeps_the_newest_two() {
    let f = fleet(&[("agent-1", "name: agent-1\n")]);
    f.manager.initialize().await.unwrap();

    // Three completed jobs at distinct start times A < B < C
    let mut ids = Vec::new();
    for _ in 0..3 {
        let receipt = f
            .manager
            .trigger("agent-1", None, TriggerOptions::default())
            .await
            .unwrap();
        ids.push(receipt.job_id.clone());
        receipt.outcome().await;
        f.clock.advance(std::time::Duration::from_secs(60));
    }

    let job_manager = f.manager.job_manager().unwrap();
    let deleted = job_manager
        .apply_retention(&RetentionPolicy {
            max_jobs_per_agent: 2,
            max_total_jobs: 0,
        })
        .unwrap();
    assert_eq!(deleted, 1);

    // Survivors are B and C; A's files are gone
    let store = JobStore::open(&f.state_dir()).unwrap();
    let (remaining, _) = store.load_all().unwrap();
    let mut remaining_ids: Vec<String> =
        remaining.iter().map(|j| j.id.to_string()).collect();
    remaining_ids.sort();
    let mut expected: Vec<String> = ids[1..].iter().map(|id| id.to_string()).collect();
    expected.sort();
    assert_eq!(remaining_ids, expected);

    assert!(!store.metadata_path(&ids[0]).exists());
    assert!(!store.output_path(&ids[0]).exists());
}

#[tokio::test]
async fn fleet_cap_applies_after_per_agent_cap() {
    let f = fleet(&[
        ("agent-1", "name: agent-1\n"),
        ("agent-2", "name: agent-2\n"),
    ]);
    f.manager.initialize().await.unwrap();

    for agent in ["agent-1", "agent-2"] {
        for _ in 0..2 {
            let receipt = f
                .manager
                .trigger(agent, None, TriggerOptions::default())
                .await
                .unwrap();
            receipt.outcome().await;
            f.clock.advance(std::time::Duration::from_secs(60));
        }
    }

    let job_manager = f.manager.job_manager().unwrap();
    let deleted = job_manager
        .apply_retention(&RetentionPolicy {
            max_jobs_per_agent: 2,
            max_total_jobs: 3,
        })
        .unwrap();
    assert_eq!(deleted, 1);

    let store = JobStore::open(&f.state_dir()).unwrap();
    let (remaining, _) = store.load_all().unwrap();
    assert_eq!(remaining.len(), 3);
    // The single oldest job fleet-wide was the one removed
    let oldest = remaining
        .iter()
        .map(|j| j.started_at)
        .min()
        .unwrap();
    assert!(remaining.iter().filter(|j| j.started_at == oldest).count() <= 1);
}
