// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live streaming of a job's output log.
//!
//! A background task tails the `.jsonl` file from a byte offset and polls
//! the job's metadata for a terminal status. Everything already persisted
//! is emitted immediately on subscribe; `End` fires once the job is
//! terminal and the remaining lines are drained.

use crate::job_store::{JobStore, StoreError};
use drover_core::{JobId, SdkMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::warn;

/// Default metadata poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Events from an output stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// One persisted output message, in production order
    Message(SdkMessage),
    /// The job reached a terminal status and all output was drained
    End,
    /// The stream failed and will emit nothing further
    Error(String),
}

/// Handle to a live output stream.
///
/// Dropping the handle stops the background task.
pub struct OutputStream {
    events: mpsc::Receiver<StreamEvent>,
    stop: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl OutputStream {
    /// Receive the next stream event. `None` after `End`/`Error`/`stop()`.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Stop the stream and free its timers. Idempotent.
    pub fn stop(&mut self) {
        self.stop.notify_one();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start streaming a job's output.
///
/// A missing output file is tolerated (not-yet-started job): nothing is
/// emitted until writes appear. Missing metadata is also tolerated until
/// it shows up.
pub fn stream_output(store: JobStore, id: JobId, poll_interval: Duration) -> OutputStream {
    let (tx, rx) = mpsc::channel(64);
    let stop = Arc::new(Notify::new());
    let stop_task = Arc::clone(&stop);

    let task = tokio::spawn(async move {
        let mut offset = 0u64;

        loop {
            if !drain_new_lines(&store, &id, &mut offset, &tx).await {
                return;
            }

            match store.read(&id) {
                Ok(job) if job.is_terminal() => {
                    // Drain anything written between the read above and the
                    // terminal metadata write
                    if !drain_new_lines(&store, &id, &mut offset, &tx).await {
                        return;
                    }
                    let _ = tx.send(StreamEvent::End).await;
                    return;
                }
                Ok(_) => {}
                Err(StoreError::JobNotFound(_)) => {}
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return;
                }
            }

            tokio::select! {
                _ = stop_task.notified() => return,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    });

    OutputStream {
        events: rx,
        stop,
        task: Some(task),
    }
}

/// Emit lines newly appended past `offset`. Returns false when the
/// receiver is gone.
async fn drain_new_lines(
    store: &JobStore,
    id: &JobId,
    offset: &mut u64,
    tx: &mpsc::Sender<StreamEvent>,
) -> bool {
    let (messages, new_offset) = match store.read_output_from(id, *offset) {
        Ok(result) => result,
        Err(e) => {
            warn!(job_id = %id, error = %e, "failed to read output log");
            return true;
        }
    };
    *offset = new_offset;
    for message in messages {
        if tx.send(StreamEvent::Message(message)).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
