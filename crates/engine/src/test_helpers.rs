// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::event_bus::EventBus;
use crate::tracker::JobTracker;
use crate::FleetContext;
use drover_adapters::FakeLlmAdapter;
use drover_config::{FleetMeta, ResolvedAgent, ResolvedConfig, ScheduleDef};
use drover_core::{Event, FakeClock, SequentialJobIdGen};
use drover_storage::JobStore;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub fn test_agent(name: &str) -> ResolvedAgent {
    ResolvedAgent {
        name: name.to_string(),
        model: "default".to_string(),
        working_dir: PathBuf::from("/tmp"),
        max_concurrent: 1,
        runtime: "sdk".to_string(),
        schedules: IndexMap::new(),
        chat: None,
        config_dir: PathBuf::from("/tmp"),
    }
}

pub fn schedule_def(interval: &str, prompt: Option<&str>, enabled: bool) -> ScheduleDef {
    ScheduleDef {
        schedule_type: "interval".to_string(),
        interval: interval.to_string(),
        prompt: prompt.map(String::from),
        enabled,
    }
}

pub fn with_schedule(mut agent: ResolvedAgent, name: &str, def: ScheduleDef) -> ResolvedAgent {
    agent.schedules.insert(name.to_string(), def);
    agent
}

pub fn test_config(agents: Vec<ResolvedAgent>) -> Arc<ResolvedConfig> {
    Arc::new(ResolvedConfig {
        fleet: FleetMeta {
            name: Some("test-fleet".to_string()),
            description: None,
        },
        agents,
        config_path: PathBuf::from("/tmp/fleet.yaml"),
        config_dir: PathBuf::from("/tmp"),
        content_hash: "test".to_string(),
    })
}

pub struct TestFixture {
    pub dir: TempDir,
    pub ctx: FleetContext<FakeLlmAdapter, FakeClock>,
    pub llm: FakeLlmAdapter,
    pub clock: FakeClock,
    pub bus: EventBus,
    pub tracker: JobTracker,
}

pub fn fixture(agents: Vec<ResolvedAgent>) -> TestFixture {
    let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let bus = EventBus::new();
    let llm = FakeLlmAdapter::new();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_773_478_800_000); // 2026-03-14T09:00:00Z
    let tracker = JobTracker::new();
    let jobs = JobStore::open(dir.path()).unwrap_or_else(|e| panic!("job store: {e}"));

    let ctx = FleetContext::new(
        test_config(agents),
        dir.path().to_path_buf(),
        bus.clone(),
        jobs,
        tracker.clone(),
        SequentialJobIdGen::new(),
        llm.clone(),
        clock.clone(),
    );

    TestFixture {
        dir,
        ctx,
        llm,
        clock,
        bus,
        tracker,
    }
}

/// Record every event the bus emits.
pub fn record_events(bus: &EventBus) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    bus.on_any(move |event| sink.lock().push(event.clone()));
    events
}

/// The wire names of recorded events, in order.
pub fn event_names(events: &Arc<Mutex<Vec<Event>>>) -> Vec<String> {
    events
        .lock()
        .iter()
        .map(|e| e.kind().to_string())
        .collect()
}
