//! Shared fixtures for the behavioral specs.

use drover_adapters::FakeLlmAdapter;
use drover_core::{Event, FakeClock, SequentialJobIdGen};
use drover_engine::FleetManager;
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const FAST_CHECK: Duration = Duration::from_millis(25);

pub struct Fleet {
    pub dir: TempDir,
    pub llm: FakeLlmAdapter,
    pub clock: FakeClock,
    pub manager: FleetManager<FakeLlmAdapter, FakeClock>,
}

impl Fleet {
    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }
}

/// Write a fleet file plus agent files into `dir`.
pub fn write_fleet(dir: &TempDir, agents: &[(&str, &str)]) {
    let agents_dir = dir.path().join("agents");
    fs::create_dir_all(&agents_dir).unwrap();
    let mut refs = String::new();
    for (file, body) in agents {
        fs::write(agents_dir.join(format!("{file}.yaml")), body).unwrap();
        refs.push_str(&format!("  - path: agents/{file}.yaml\n"));
    }
    fs::write(
        dir.path().join("fleet.yaml"),
        format!("version: 1\nfleet:\n  name: spec-fleet\nagents:\n{refs}"),
    )
    .unwrap();
}

/// A fleet manager over a fresh temp dir, driven by fakes.
pub fn fleet(agents: &[(&str, &str)]) -> Fleet {
    let dir = TempDir::new().unwrap();
    write_fleet(&dir, agents);
    let llm = FakeLlmAdapter::new();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_773_478_800_000); // 2026-03-14T09:00:00Z
    let manager = FleetManager::with_clock(
        dir.path().join("fleet.yaml"),
        dir.path().join("state"),
        llm.clone(),
        clock.clone(),
    )
    .with_check_interval(FAST_CHECK)
    .with_id_gen(SequentialJobIdGen::new());
    Fleet {
        dir,
        llm,
        clock,
        manager,
    }
}

/// Record every event emitted on the manager's bus.
pub fn record_events(fleet: &Fleet) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    fleet.manager.bus().on_any(move |event| sink.lock().push(event.clone()));
    events
}

pub fn event_names(events: &Arc<Mutex<Vec<Event>>>) -> Vec<String> {
    events
        .lock()
        .iter()
        .map(|e| e.kind().to_string())
        .collect()
}
