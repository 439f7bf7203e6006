// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config file watching for `start --watch`.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::warn;

/// Watch the config directory, signalling `tx` on relevant changes.
///
/// The watcher lives as long as the returned value; drop it to stop.
/// Consumers should debounce: editors fire several events per save.
pub fn spawn(config_dir: &Path, tx: mpsc::Sender<()>) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) => {
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    // Full channel means a reload is already pending
                    let _ = tx.try_send(());
                }
            }
            Err(e) => warn!(error = %e, "config watcher error"),
        }
    })?;
    watcher.watch(config_dir, RecursiveMode::Recursive)?;
    Ok(watcher)
}
