// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared context handed to the engine's subsystems.
//!
//! [`FleetContext`] carries the live config, the state dir, the bus, the
//! stores, and the adapters. Chat managers see it only through the
//! object-safe [`FleetApi`] facade, which keeps them decoupled from the
//! adapter type parameters and avoids cyclic ownership with the manager.

use crate::event_bus::EventBus;
use crate::executor::{trigger_job, TriggerOptions, TriggerReceipt};
use crate::tracker::JobTracker;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use drover_adapters::LlmAdapter;
use drover_config::ResolvedConfig;
use drover_core::{Clock, FleetError, JobId, JobIdGen};
use drover_storage::{JobStore, StoreError};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object-safe id generator wrapper so the context doesn't grow a type
/// parameter per generator.
#[derive(Clone)]
pub(crate) struct DynJobIdGen(Arc<dyn Fn(NaiveDate) -> JobId + Send + Sync>);

impl DynJobIdGen {
    pub(crate) fn new(generate: Arc<dyn Fn(NaiveDate) -> JobId + Send + Sync>) -> Self {
        Self(generate)
    }
}

impl JobIdGen for DynJobIdGen {
    fn generate(&self, date: NaiveDate) -> JobId {
        (self.0)(date)
    }
}

/// Shared engine state.
pub struct FleetContext<L: LlmAdapter, C: Clock> {
    config: Arc<RwLock<Arc<ResolvedConfig>>>,
    state_dir: PathBuf,
    bus: EventBus,
    jobs: JobStore,
    tracker: JobTracker,
    id_gen: DynJobIdGen,
    llm: L,
    clock: C,
}

impl<L: LlmAdapter, C: Clock> Clone for FleetContext<L, C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            state_dir: self.state_dir.clone(),
            bus: self.bus.clone(),
            jobs: self.jobs.clone(),
            tracker: self.tracker.clone(),
            id_gen: self.id_gen.clone(),
            llm: self.llm.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<L: LlmAdapter, C: Clock> FleetContext<L, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<ResolvedConfig>,
        state_dir: PathBuf,
        bus: EventBus,
        jobs: JobStore,
        tracker: JobTracker,
        id_gen: impl JobIdGen,
        llm: L,
        clock: C,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            state_dir,
            bus,
            jobs,
            tracker,
            id_gen: DynJobIdGen(Arc::new(move |date| id_gen.generate(date))),
            llm,
            clock,
        }
    }

    /// Snapshot of the current config.
    pub fn config(&self) -> Arc<ResolvedConfig> {
        Arc::clone(&self.config.read())
    }

    /// Atomically swap in a freshly resolved config.
    ///
    /// In-flight jobs keep the snapshot they were launched with.
    pub fn swap_config(&self, config: Arc<ResolvedConfig>) {
        *self.config.write() = config;
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn id_gen(&self) -> &DynJobIdGen {
        &self.id_gen
    }

    /// Map a store failure onto the control-plane taxonomy.
    pub(crate) fn store_error(&self, error: StoreError) -> FleetError {
        match error {
            StoreError::JobNotFound(id) => FleetError::JobNotFound {
                job_id: id.to_string(),
            },
            other => FleetError::StateDir {
                state_dir: self.state_dir.clone(),
                source: std::io::Error::other(other.to_string()),
            },
        }
    }
}

/// Narrow read-only facade over the fleet, plus the trigger entry point.
///
/// Handed to chat managers as `Arc<dyn FleetApi>`.
#[async_trait]
pub trait FleetApi: Send + Sync {
    /// Current resolved config snapshot.
    fn config(&self) -> Arc<ResolvedConfig>;

    /// The state directory.
    fn state_dir(&self) -> &Path;

    /// The event bus.
    fn bus(&self) -> &EventBus;

    /// Current wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Trigger a job. See [`crate::executor`].
    async fn trigger(
        &self,
        agent: &str,
        schedule: Option<&str>,
        options: TriggerOptions,
    ) -> Result<TriggerReceipt, FleetError>;
}

#[async_trait]
impl<L: LlmAdapter, C: Clock> FleetApi for FleetContext<L, C> {
    fn config(&self) -> Arc<ResolvedConfig> {
        FleetContext::config(self)
    }

    fn state_dir(&self) -> &Path {
        FleetContext::state_dir(self)
    }

    fn bus(&self) -> &EventBus {
        FleetContext::bus(self)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    async fn trigger(
        &self,
        agent: &str,
        schedule: Option<&str>,
        options: TriggerOptions,
    ) -> Result<TriggerReceipt, FleetError> {
        trigger_job(self, agent, schedule, options).await
    }
}
