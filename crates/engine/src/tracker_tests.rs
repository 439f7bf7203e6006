// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn id(n: u32) -> JobId {
    JobId::new(format!("job-2026-03-14-{n:06}"))
}

#[test]
fn begin_and_finish_track_counts() {
    let tracker = JobTracker::new();
    tracker.begin("agent-1", &id(1));
    tracker.begin("agent-1", &id(2));
    tracker.begin("agent-2", &id(3));

    assert_eq!(tracker.active_count("agent-1"), 2);
    assert_eq!(tracker.active_count("agent-2"), 1);
    assert_eq!(tracker.total_active(), 3);

    tracker.finish(&id(1));
    assert_eq!(tracker.active_count("agent-1"), 1);
    assert_eq!(tracker.total_active(), 2);
}

#[test]
fn finish_is_idempotent() {
    let tracker = JobTracker::new();
    tracker.begin("agent-1", &id(1));
    tracker.finish(&id(1));
    tracker.finish(&id(1));
    assert_eq!(tracker.active_count("agent-1"), 0);
    assert!(!tracker.is_active(&id(1)));
}

#[test]
fn unknown_agent_has_zero_count() {
    let tracker = JobTracker::new();
    assert_eq!(tracker.active_count("ghost"), 0);
}

#[tokio::test]
async fn cancel_wakes_the_handle() {
    let tracker = JobTracker::new();
    let cancel = tracker.begin("agent-1", &id(1));

    let waiter = tokio::spawn(async move { cancel.notified().await });
    tokio::task::yield_now().await;
    assert!(tracker.cancel(&id(1)));
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[test]
fn cancel_unknown_job_is_false() {
    let tracker = JobTracker::new();
    assert!(!tracker.cancel(&id(9)));
}

#[tokio::test]
async fn wait_idle_returns_when_drained() {
    let tracker = JobTracker::new();
    tracker.begin("agent-1", &id(1));

    let t = tracker.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        t.finish(&id(1));
    });

    assert!(tracker.wait_idle(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn wait_idle_times_out() {
    let tracker = JobTracker::new();
    tracker.begin("agent-1", &id(1));
    assert!(!tracker.wait_idle(Duration::from_millis(80)).await);
}
