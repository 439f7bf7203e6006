// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-based schedule driving.
//!
//! One spawned task ticks every `check_interval` (first tick immediately on
//! start). Ticks are serialized: the due set of a tick is fully dispatched
//! before the next tick begins. `last_run_at` is stamped before launching
//! so a slow job does not re-trigger on the next tick.

use crate::context::FleetContext;
use crate::event_bus::SubscriptionId;
use crate::executor::{trigger_job, TriggerOptions};
use chrono::{DateTime, Utc};
use drover_adapters::LlmAdapter;
use drover_core::{
    parse_interval, Clock, Event, EventKind, FleetError, JobId, ScheduleState, ScheduleStatus,
    SkipReason, TriggerKind,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default tick interval.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

type ScheduleKey = (String, String);

#[derive(Debug, Default, Clone)]
struct SchedEntry {
    disabled: bool,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    /// Non-terminal jobs carrying this schedule name
    active: usize,
}

impl SchedEntry {
    fn state(&self) -> ScheduleState {
        ScheduleState {
            status: if self.disabled {
                ScheduleStatus::Disabled
            } else if self.active > 0 {
                ScheduleStatus::Running
            } else {
                ScheduleStatus::Idle
            },
            last_run_at: self.last_run_at,
            next_run_at: self.next_run_at,
        }
    }

    fn is_due(&self, interval: Duration, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => {
                now.signed_duration_since(last)
                    >= chrono::Duration::milliseconds(interval.as_millis() as i64)
            }
        }
    }
}

#[derive(Default)]
struct SchedulerState {
    schedules: HashMap<ScheduleKey, SchedEntry>,
    /// Non-terminal jobs mapped back to their schedule
    active_jobs: HashMap<JobId, ScheduleKey>,
}

enum TickAction {
    Skip {
        agent: String,
        schedule: String,
        reason: SkipReason,
    },
    Fire {
        agent: String,
        schedule: String,
    },
}

/// Drives interval schedules against the trigger path.
pub struct Scheduler<L: LlmAdapter, C: Clock> {
    ctx: FleetContext<L, C>,
    check_interval: Duration,
    inner: Arc<Mutex<SchedulerState>>,
    stop: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl<L: LlmAdapter, C: Clock> Scheduler<L, C> {
    pub fn new(ctx: FleetContext<L, C>, check_interval: Duration) -> Self {
        Self {
            ctx,
            check_interval,
            inner: Arc::new(Mutex::new(SchedulerState::default())),
            stop: Arc::new(Notify::new()),
            task: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Start the tick loop. The first tick runs immediately.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        self.subscribe_job_events();

        let scheduler = Arc::clone(self);
        let stop = Arc::clone(&self.stop);
        let check_interval = self.check_interval;
        *task = Some(tokio::spawn(async move {
            loop {
                scheduler.tick().await;
                tokio::select! {
                    _ = stop.notified() => return,
                    _ = tokio::time::sleep(check_interval) => {}
                }
            }
        }));
        info!(check_interval_ms = self.check_interval.as_millis() as u64, "scheduler started");
    }

    /// Stop the tick loop and free its timer. In-flight jobs are left alone.
    pub fn stop(&self) {
        self.stop.notify_waiters();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        let mut subscriptions = self.subscriptions.lock();
        for id in subscriptions.drain(..) {
            self.ctx.bus().off(id);
        }
        info!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Track schedule occupancy through the job lifecycle events, so the
    /// "running" status holds for any trigger source that names a schedule.
    fn subscribe_job_events(&self) {
        let bus = self.ctx.bus();
        let mut subscriptions = self.subscriptions.lock();

        let inner = Arc::clone(&self.inner);
        subscriptions.push(bus.on(EventKind::JobCreated, move |event| {
            let Event::JobCreated { job } = event else {
                return;
            };
            let Some(schedule) = &job.schedule else {
                return;
            };
            let key = (job.agent.clone(), schedule.clone());
            let mut state = inner.lock();
            state.active_jobs.insert(job.id.clone(), key.clone());
            state.schedules.entry(key).or_default().active += 1;
        }));

        for kind in [
            EventKind::JobCompleted,
            EventKind::JobFailed,
            EventKind::JobCancelled,
        ] {
            let inner = Arc::clone(&self.inner);
            subscriptions.push(bus.on(kind, move |event| {
                let job_id = match event {
                    Event::JobCompleted { job_id, .. }
                    | Event::JobFailed { job_id, .. }
                    | Event::JobCancelled { job_id, .. } => job_id,
                    _ => return,
                };
                let mut state = inner.lock();
                if let Some(key) = state.active_jobs.remove(job_id) {
                    if let Some(entry) = state.schedules.get_mut(&key) {
                        entry.active = entry.active.saturating_sub(1);
                    }
                }
            }));
        }
    }

    /// One pass over every enabled schedule.
    async fn tick(&self) {
        let config = self.ctx.config();
        let now = self.ctx.clock().now_utc();

        // Decide under the lock, act outside it: the bus and the trigger
        // path both re-enter scheduler state via subscriptions.
        let actions: Vec<TickAction> = {
            let mut state = self.inner.lock();
            let mut actions = Vec::new();

            for agent in &config.agents {
                for (name, def) in &agent.schedules {
                    if !def.enabled {
                        continue;
                    }
                    let interval = match parse_interval(&def.interval) {
                        Ok(interval) => interval,
                        Err(e) => {
                            warn!(agent = %agent.name, schedule = %name, error = %e, "unparseable interval");
                            continue;
                        }
                    };

                    let key = (agent.name.clone(), name.clone());
                    let entry = state.schedules.entry(key).or_default();
                    if !entry.is_due(interval, now) {
                        continue;
                    }

                    if entry.disabled {
                        actions.push(TickAction::Skip {
                            agent: agent.name.clone(),
                            schedule: name.clone(),
                            reason: SkipReason::Disabled,
                        });
                        continue;
                    }
                    if entry.active > 0
                        || self.ctx.tracker().active_count(&agent.name) >= agent.max_concurrent
                    {
                        actions.push(TickAction::Skip {
                            agent: agent.name.clone(),
                            schedule: name.clone(),
                            reason: SkipReason::AlreadyRunning,
                        });
                        continue;
                    }

                    // Stamp before launching: a slow job must not re-fire
                    // on the next tick.
                    entry.last_run_at = Some(now);
                    entry.next_run_at = now.checked_add_signed(chrono::Duration::milliseconds(
                        interval.as_millis() as i64,
                    ));
                    actions.push(TickAction::Fire {
                        agent: agent.name.clone(),
                        schedule: name.clone(),
                    });
                }
            }
            actions
        };

        for action in actions {
            match action {
                TickAction::Skip {
                    agent,
                    schedule,
                    reason,
                } => {
                    debug!(agent = %agent, schedule = %schedule, reason = %reason, "schedule skipped");
                    self.ctx.bus().emit(&Event::ScheduleSkipped {
                        agent,
                        schedule,
                        reason,
                    });
                }
                TickAction::Fire { agent, schedule } => {
                    let options = TriggerOptions {
                        trigger: Some(TriggerKind::Schedule),
                        ..Default::default()
                    };
                    match trigger_job(&self.ctx, &agent, Some(&schedule), options).await {
                        Ok(receipt) => {
                            self.ctx.bus().emit(&Event::ScheduleTriggered {
                                agent,
                                schedule,
                                job_id: receipt.job_id,
                            });
                        }
                        Err(FleetError::ConcurrencyLimit { .. }) => {
                            self.ctx.bus().emit(&Event::ScheduleSkipped {
                                agent,
                                schedule,
                                reason: SkipReason::AlreadyRunning,
                            });
                        }
                        Err(e) => {
                            warn!(agent = %agent, schedule = %schedule, error = %e, "schedule trigger failed");
                        }
                    }
                }
            }
        }
    }

    /// Adopt a reloaded config: drop runtime state for schedules that no
    /// longer exist. Surviving entries keep their disabled flag and run
    /// history.
    pub fn sync_with_config(&self) {
        let config = self.ctx.config();
        let mut state = self.inner.lock();
        state.schedules.retain(|(agent, schedule), _| {
            config
                .agent(agent)
                .is_some_and(|a| a.schedule(schedule).is_some())
        });
    }

    /// Runtime state for one schedule.
    pub fn schedule_state(&self, agent: &str, schedule: &str) -> ScheduleState {
        let key = (agent.to_string(), schedule.to_string());
        self.inner
            .lock()
            .schedules
            .get(&key)
            .map(SchedEntry::state)
            .unwrap_or_default()
    }

    /// Toggle a schedule at runtime. Validation happens in the manager.
    pub fn set_disabled(&self, agent: &str, schedule: &str, disabled: bool) {
        let key = (agent.to_string(), schedule.to_string());
        self.inner.lock().schedules.entry(key).or_default().disabled = disabled;
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
