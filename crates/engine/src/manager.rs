// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet lifecycle management: the central supervisor.
//!
//! States: `uninitialized → initialized → running → stopped`, plus an
//! absorbing `error` when initialization fails. Control operations called
//! in the wrong state raise typed invalid-state errors; reload failures
//! keep the previous config authoritative.

use crate::context::{DynJobIdGen, FleetApi, FleetContext};
use crate::event_bus::EventBus;
use crate::executor::{trigger_job, TriggerOptions, TriggerReceipt};
use crate::job_manager::JobManager;
use crate::scheduler::{Scheduler, DEFAULT_CHECK_INTERVAL};
use crate::tracker::JobTracker;
use async_trait::async_trait;
use chrono::NaiveDate;
use drover_adapters::LlmAdapter;
use drover_config::{diff_configs, load_config, ResolvedConfig};
use drover_core::{
    CancelFailure, Clock, ConfigChange, Event, FleetError, ForkFailure, JobId, JobIdGen,
    RandomJobIdGen, ScheduleState, SystemClock, TriggerKind,
};
use drover_storage::{JobStore, StoreError};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Lifecycle state of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
    Error,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerState::Uninitialized => write!(f, "uninitialized"),
            ManagerState::Initialized => write!(f, "initialized"),
            ManagerState::Running => write!(f, "running"),
            ManagerState::Stopped => write!(f, "stopped"),
            ManagerState::Error => write!(f, "error"),
        }
    }
}

/// Shutdown policy.
#[derive(Debug, Clone)]
pub struct StopOptions {
    /// How long to wait for in-flight jobs
    pub timeout: Duration,
    /// Cancel whatever remains after `timeout`
    pub cancel_on_timeout: bool,
    /// How long to wait for cancellations to land
    pub cancel_timeout: Duration,
}

impl Default for StopOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            cancel_on_timeout: true,
            cancel_timeout: Duration::from_secs(10),
        }
    }
}

/// Snapshot returned by `get_fleet_status`.
#[derive(Debug, Clone)]
pub struct FleetStatus {
    pub state: String,
    pub uptime: Option<Duration>,
    pub agent_count: usize,
    pub active_jobs: usize,
    pub scheduler_running: bool,
}

/// One schedule's definition plus runtime state.
#[derive(Debug, Clone)]
pub struct ScheduleInfo {
    pub agent: String,
    pub name: String,
    pub schedule_type: String,
    pub interval: String,
    pub prompt: Option<String>,
    pub enabled: bool,
    pub state: ScheduleState,
}

/// Agent snapshot including its schedules.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub name: String,
    pub model: String,
    pub working_dir: PathBuf,
    pub max_concurrent: usize,
    pub runtime: String,
    pub active_jobs: usize,
    pub has_discord: bool,
    pub has_slack: bool,
    pub schedules: Vec<ScheduleInfo>,
}

/// Lifecycle hooks a chat manager plugs into the fleet with.
///
/// Failures are handled inside the manager (logged, degraded); these hooks
/// never abort fleet startup.
#[async_trait]
pub trait ChatManagerHandle: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&self, api: Arc<dyn FleetApi>);
    async fn start(&self);
    async fn stop(&self);
}

struct ManagerInner<L: LlmAdapter, C: Clock> {
    state: ManagerState,
    ctx: Option<FleetContext<L, C>>,
    scheduler: Option<Arc<Scheduler<L, C>>>,
    started_at: Option<Instant>,
    // NOTE(lifetime): held to maintain the exclusive state-dir lock;
    // released on drop at stop
    lock_file: Option<File>,
}

/// The central supervisor.
pub struct FleetManager<L: LlmAdapter, C: Clock = SystemClock> {
    config_path: PathBuf,
    state_dir: PathBuf,
    llm: L,
    clock: C,
    bus: EventBus,
    check_interval: Duration,
    lock_state_dir: bool,
    id_gen: Arc<dyn Fn(NaiveDate) -> JobId + Send + Sync>,
    chat: Vec<Arc<dyn ChatManagerHandle>>,
    inner: Mutex<ManagerInner<L, C>>,
}

impl<L: LlmAdapter> FleetManager<L, SystemClock> {
    /// Create a manager with the system clock.
    pub fn new(config_path: impl Into<PathBuf>, state_dir: impl Into<PathBuf>, llm: L) -> Self {
        Self::with_clock(config_path, state_dir, llm, SystemClock)
    }
}

impl<L: LlmAdapter, C: Clock> FleetManager<L, C> {
    /// Create a manager with an explicit clock (tests).
    pub fn with_clock(
        config_path: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
        llm: L,
        clock: C,
    ) -> Self {
        let default_gen = RandomJobIdGen;
        Self {
            config_path: config_path.into(),
            state_dir: state_dir.into(),
            llm,
            clock,
            bus: EventBus::new(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            lock_state_dir: false,
            id_gen: Arc::new(move |date| default_gen.generate(date)),
            chat: Vec::new(),
            inner: Mutex::new(ManagerInner {
                state: ManagerState::Uninitialized,
                ctx: None,
                scheduler: None,
                started_at: None,
                lock_file: None,
            }),
        }
    }

    /// Override the scheduler tick interval.
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Override the job id generator (tests).
    pub fn with_id_gen(mut self, id_gen: impl JobIdGen) -> Self {
        self.id_gen = Arc::new(move |date| id_gen.generate(date));
        self
    }

    /// Take an exclusive advisory lock on the state dir at initialize.
    pub fn with_state_dir_lock(mut self) -> Self {
        self.lock_state_dir = true;
        self
    }

    /// Plug in a chat manager.
    pub fn with_chat_manager(mut self, manager: Arc<dyn ChatManagerHandle>) -> Self {
        self.chat.push(manager);
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn state(&self) -> ManagerState {
        self.inner.lock().state
    }

    /// The currently resolved config, if initialized.
    pub fn get_config(&self) -> Option<Arc<ResolvedConfig>> {
        self.inner.lock().ctx.as_ref().map(FleetContext::config)
    }

    fn set_state(&self, state: ManagerState) {
        self.inner.lock().state = state;
    }

    fn require_ctx(
        &self,
        operation: &str,
        allowed: &[ManagerState],
    ) -> Result<FleetContext<L, C>, FleetError> {
        let inner = self.inner.lock();
        if !allowed.contains(&inner.state) {
            return Err(FleetError::invalid_state(
                operation,
                inner.state,
                expected_states(allowed),
            ));
        }
        inner.ctx.clone().ok_or_else(|| {
            FleetError::invalid_state(operation, inner.state, expected_states(allowed))
        })
    }

    fn state_dir_error(&self, source: std::io::Error) -> FleetError {
        FleetError::StateDir {
            state_dir: self.state_dir.clone(),
            source,
        }
    }

    /// Resolve config, create the state dir, and wire subsystems.
    ///
    /// On failure the manager lands in the absorbing `error` state and the
    /// underlying error is raised.
    pub async fn initialize(&self) -> Result<(), FleetError> {
        {
            let inner = self.inner.lock();
            if inner.state != ManagerState::Uninitialized {
                return Err(FleetError::invalid_state(
                    "initialize",
                    inner.state,
                    "uninitialized",
                ));
            }
        }

        let config = match load_config(&self.config_path) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                self.set_state(ManagerState::Error);
                return Err(e.into_fleet_error());
            }
        };

        if let Err(e) = std::fs::create_dir_all(&self.state_dir) {
            self.set_state(ManagerState::Error);
            return Err(self.state_dir_error(e));
        }

        let lock_file = if self.lock_state_dir {
            match acquire_state_dir_lock(&self.state_dir) {
                Ok(file) => Some(file),
                Err(e) => {
                    self.set_state(ManagerState::Error);
                    return Err(self.state_dir_error(e));
                }
            }
        } else {
            None
        };

        let jobs = match JobStore::open(&self.state_dir) {
            Ok(store) => store,
            Err(StoreError::Io(e)) => {
                self.set_state(ManagerState::Error);
                return Err(self.state_dir_error(e));
            }
            Err(e) => {
                self.set_state(ManagerState::Error);
                return Err(self.state_dir_error(std::io::Error::other(e.to_string())));
            }
        };

        let ctx = FleetContext::new(
            Arc::clone(&config),
            self.state_dir.clone(),
            self.bus.clone(),
            jobs,
            JobTracker::new(),
            DynJobIdGen::new(Arc::clone(&self.id_gen)),
            self.llm.clone(),
            self.clock.clone(),
        );
        let scheduler = Arc::new(Scheduler::new(ctx.clone(), self.check_interval));

        let api: Arc<dyn FleetApi> = Arc::new(ctx.clone());
        for chat in &self.chat {
            chat.initialize(Arc::clone(&api)).await;
        }

        {
            let mut inner = self.inner.lock();
            inner.ctx = Some(ctx);
            inner.scheduler = Some(scheduler);
            inner.lock_file = lock_file;
            inner.state = ManagerState::Initialized;
        }

        info!(
            config = %self.config_path.display(),
            agents = config.agents.len(),
            "fleet initialized"
        );
        self.bus.emit(&Event::Initialized {
            agent_count: config.agents.len(),
            state_dir: self.state_dir.clone(),
        });
        Ok(())
    }

    /// Start the scheduler and the chat managers.
    pub async fn start(&self) -> Result<(), FleetError> {
        let (ctx, scheduler) = {
            let inner = self.inner.lock();
            if inner.state != ManagerState::Initialized {
                return Err(FleetError::invalid_state("start", inner.state, "initialized"));
            }
            match (&inner.ctx, &inner.scheduler) {
                (Some(ctx), Some(scheduler)) => (ctx.clone(), Arc::clone(scheduler)),
                _ => {
                    return Err(FleetError::invalid_state(
                        "start",
                        inner.state,
                        "initialized",
                    ))
                }
            }
        };

        scheduler.start();
        for chat in &self.chat {
            chat.start().await;
        }

        {
            let mut inner = self.inner.lock();
            inner.state = ManagerState::Running;
            inner.started_at = Some(Instant::now());
        }

        let config = ctx.config();
        for agent in &config.agents {
            self.bus.emit(&Event::AgentStarted {
                agent: agent.name.clone(),
            });
        }
        self.bus.emit(&Event::Started {
            agent_count: config.agents.len(),
        });
        info!(agents = config.agents.len(), "fleet running");
        Ok(())
    }

    /// Stop the scheduler and connectors, then wait for in-flight jobs.
    ///
    /// No-op when already initialized-but-never-started or stopped. The
    /// manager always lands in `stopped`; a shutdown that still has jobs
    /// in flight afterwards is surfaced as an error.
    pub async fn stop(&self, options: StopOptions) -> Result<(), FleetError> {
        let (ctx, scheduler) = {
            let inner = self.inner.lock();
            match inner.state {
                ManagerState::Running => {}
                ManagerState::Initialized | ManagerState::Stopped => return Ok(()),
                state => {
                    return Err(FleetError::invalid_state("stop", state, "running"));
                }
            }
            match (&inner.ctx, &inner.scheduler) {
                (Some(ctx), Some(scheduler)) => (ctx.clone(), Arc::clone(scheduler)),
                _ => return Ok(()),
            }
        };

        scheduler.stop();
        for chat in &self.chat {
            chat.stop().await;
        }

        let tracker = ctx.tracker();
        let mut graceful = tracker.wait_idle(options.timeout).await;
        if !graceful && options.cancel_on_timeout {
            warn!(
                remaining = tracker.total_active(),
                "stop timed out; cancelling remaining jobs"
            );
            tracker.cancel_all();
            tracker.wait_idle(options.cancel_timeout).await;
        }
        let remaining = tracker.total_active();
        graceful = graceful && remaining == 0;

        let config = ctx.config();
        for agent in &config.agents {
            self.bus.emit(&Event::AgentStopped {
                agent: agent.name.clone(),
            });
        }
        self.bus.emit(&Event::Stopped { graceful });

        {
            let mut inner = self.inner.lock();
            inner.state = ManagerState::Stopped;
            inner.started_at = None;
            // Releases the advisory lock
            inner.lock_file = None;
        }
        info!(graceful, "fleet stopped");

        if remaining > 0 {
            return Err(FleetError::Shutdown { timed_out: true });
        }
        Ok(())
    }

    /// Re-resolve the config and swap it in transactionally.
    ///
    /// A parse/validate failure keeps the previous config and raises; no
    /// events are emitted in that case.
    pub async fn reload(&self) -> Result<Vec<ConfigChange>, FleetError> {
        let ctx = self.require_ctx(
            "reload",
            &[
                ManagerState::Initialized,
                ManagerState::Running,
                ManagerState::Stopped,
            ],
        )?;

        let old = ctx.config();
        let new = match load_config(&self.config_path) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                warn!(error = %e, "config reload failed. Keeping existing configuration");
                return Err(e.into_fleet_error());
            }
        };

        let changes = if new.content_hash == old.content_hash {
            Vec::new()
        } else {
            diff_configs(&old, &new)
        };

        ctx.swap_config(Arc::clone(&new));
        if let Some(scheduler) = self.inner.lock().scheduler.as_ref() {
            scheduler.sync_with_config();
        }

        info!(
            agents = new.agents.len(),
            changes = changes.len(),
            "configuration reloaded"
        );
        self.bus.emit(&Event::ConfigReloaded {
            agent_count: new.agents.len(),
            agent_names: new.agent_names(),
            config_path: new.config_path.clone(),
            changes: changes.clone(),
            timestamp: self.clock.now_utc(),
        });
        Ok(changes)
    }

    /// Trigger a job on an agent (optionally through one of its schedules).
    pub async fn trigger(
        &self,
        agent: &str,
        schedule: Option<&str>,
        options: TriggerOptions,
    ) -> Result<TriggerReceipt, FleetError> {
        let ctx = self.require_ctx(
            "trigger",
            &[ManagerState::Initialized, ManagerState::Running],
        )?;
        trigger_job(&ctx, agent, schedule, options).await
    }

    /// Cancel one in-flight job.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<(), FleetError> {
        let ctx = self.require_ctx(
            "cancel_job",
            &[ManagerState::Initialized, ManagerState::Running],
        )?;
        if ctx.tracker().cancel(job_id) {
            Ok(())
        } else {
            Err(FleetError::JobCancel {
                job_id: job_id.to_string(),
                reason: CancelFailure::NotRunning,
            })
        }
    }

    /// Fork a prior job: resume its recorded session in a new job.
    pub async fn fork_job(
        &self,
        job_id: &JobId,
        options: TriggerOptions,
    ) -> Result<TriggerReceipt, FleetError> {
        let ctx = self.require_ctx(
            "fork_job",
            &[ManagerState::Initialized, ManagerState::Running],
        )?;

        let job = match ctx.jobs().read(job_id) {
            Ok(job) => job,
            Err(StoreError::JobNotFound(_)) => {
                return Err(FleetError::JobFork {
                    original_job_id: job_id.to_string(),
                    reason: ForkFailure::JobNotFound,
                });
            }
            Err(e) => return Err(ctx.store_error(e)),
        };
        let Some(session_id) = job.session_id.clone() else {
            return Err(FleetError::JobFork {
                original_job_id: job_id.to_string(),
                reason: ForkFailure::NoSession,
            });
        };
        if ctx.config().agent(&job.agent).is_none() {
            return Err(FleetError::JobFork {
                original_job_id: job_id.to_string(),
                reason: ForkFailure::AgentNotFound,
            });
        }

        let TriggerOptions {
            prompt,
            bypass_concurrency_limit,
            on_message,
            ..
        } = options;
        let options = TriggerOptions {
            prompt: prompt.or_else(|| Some(job.prompt.clone())),
            bypass_concurrency_limit,
            on_message,
            resume: Some(session_id),
            trigger: Some(TriggerKind::Fork),
            forked_from: Some(job.id.clone()),
        };
        trigger_job(&ctx, &job.agent, None, options).await
    }

    /// Fleet snapshot: state, uptime, counts, scheduler status.
    pub fn get_fleet_status(&self) -> FleetStatus {
        let inner = self.inner.lock();
        FleetStatus {
            state: inner.state.to_string(),
            uptime: inner.started_at.map(|t| t.elapsed()),
            agent_count: inner
                .ctx
                .as_ref()
                .map_or(0, |ctx| ctx.config().agents.len()),
            active_jobs: inner
                .ctx
                .as_ref()
                .map_or(0, |ctx| ctx.tracker().total_active()),
            scheduler_running: inner
                .scheduler
                .as_ref()
                .is_some_and(|s| s.is_running()),
        }
    }

    fn schedule_info(
        &self,
        scheduler: &Scheduler<L, C>,
        agent: &drover_config::ResolvedAgent,
        name: &str,
        def: &drover_config::ScheduleDef,
    ) -> ScheduleInfo {
        ScheduleInfo {
            agent: agent.name.clone(),
            name: name.to_string(),
            schedule_type: def.schedule_type.clone(),
            interval: def.interval.clone(),
            prompt: def.prompt.clone(),
            enabled: def.enabled,
            state: scheduler.schedule_state(&agent.name, name),
        }
    }

    fn agent_info(
        &self,
        ctx: &FleetContext<L, C>,
        scheduler: &Scheduler<L, C>,
        agent: &drover_config::ResolvedAgent,
    ) -> AgentInfo {
        AgentInfo {
            name: agent.name.clone(),
            model: agent.model.clone(),
            working_dir: agent.working_dir.clone(),
            max_concurrent: agent.max_concurrent,
            runtime: agent.runtime.clone(),
            active_jobs: ctx.tracker().active_count(&agent.name),
            has_discord: agent.discord().is_some(),
            has_slack: agent.slack().is_some(),
            schedules: agent
                .schedules
                .iter()
                .map(|(name, def)| self.schedule_info(scheduler, agent, name, def))
                .collect(),
        }
    }

    fn with_parts<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&FleetContext<L, C>, &Scheduler<L, C>) -> Result<T, FleetError>,
    ) -> Result<T, FleetError> {
        let inner = self.inner.lock();
        match (&inner.ctx, &inner.scheduler) {
            (Some(ctx), Some(scheduler)) => f(ctx, scheduler.as_ref()),
            _ => Err(FleetError::invalid_state(
                operation,
                inner.state,
                "initialized",
            )),
        }
    }

    /// Snapshot of every agent.
    pub fn get_agent_info(&self) -> Result<Vec<AgentInfo>, FleetError> {
        self.with_parts("get_agent_info", |ctx, scheduler| {
            Ok(ctx
                .config()
                .agents
                .iter()
                .map(|agent| self.agent_info(ctx, scheduler, agent))
                .collect())
        })
    }

    /// Snapshot of one agent.
    pub fn get_agent_info_by_name(&self, name: &str) -> Result<AgentInfo, FleetError> {
        self.with_parts("get_agent_info", |ctx, scheduler| {
            let config = ctx.config();
            let agent = config
                .agent(name)
                .ok_or_else(|| FleetError::agent_not_found(name, config.agent_names()))?;
            Ok(self.agent_info(ctx, scheduler, agent))
        })
    }

    /// Every schedule across the fleet.
    pub fn get_schedules(&self) -> Result<Vec<ScheduleInfo>, FleetError> {
        self.with_parts("get_schedules", |ctx, scheduler| {
            let config = ctx.config();
            Ok(config
                .agents
                .iter()
                .flat_map(|agent| {
                    agent
                        .schedules
                        .iter()
                        .map(|(name, def)| self.schedule_info(scheduler, agent, name, def))
                        .collect::<Vec<_>>()
                })
                .collect())
        })
    }

    /// One schedule.
    pub fn get_schedule(&self, agent: &str, schedule: &str) -> Result<ScheduleInfo, FleetError> {
        self.with_parts("get_schedule", |ctx, scheduler| {
            let config = ctx.config();
            let resolved = config
                .agent(agent)
                .ok_or_else(|| FleetError::agent_not_found(agent, config.agent_names()))?;
            let def = resolved.schedule(schedule).ok_or_else(|| {
                FleetError::schedule_not_found(agent, schedule, resolved.schedule_names())
            })?;
            Ok(self.schedule_info(scheduler, resolved, schedule, def))
        })
    }

    /// Re-enable a runtime-disabled schedule.
    pub fn enable_schedule(&self, agent: &str, schedule: &str) -> Result<(), FleetError> {
        self.toggle_schedule(agent, schedule, false)
    }

    /// Disable a schedule at runtime; it skips with reason `disabled`.
    pub fn disable_schedule(&self, agent: &str, schedule: &str) -> Result<(), FleetError> {
        self.toggle_schedule(agent, schedule, true)
    }

    fn toggle_schedule(
        &self,
        agent: &str,
        schedule: &str,
        disabled: bool,
    ) -> Result<(), FleetError> {
        self.with_parts("toggle_schedule", |ctx, scheduler| {
            let config = ctx.config();
            let resolved = config
                .agent(agent)
                .ok_or_else(|| FleetError::agent_not_found(agent, config.agent_names()))?;
            if resolved.schedule(schedule).is_none() {
                return Err(FleetError::schedule_not_found(
                    agent,
                    schedule,
                    resolved.schedule_names(),
                ));
            }
            scheduler.set_disabled(agent, schedule, disabled);
            Ok(())
        })
    }

    /// Query surface over the job store.
    pub fn job_manager(&self) -> Result<JobManager, FleetError> {
        let ctx = self.require_ctx(
            "job_manager",
            &[
                ManagerState::Initialized,
                ManagerState::Running,
                ManagerState::Stopped,
            ],
        )?;
        Ok(JobManager::new(
            ctx.jobs().clone(),
            self.state_dir.clone(),
        ))
    }
}

fn expected_states(allowed: &[ManagerState]) -> String {
    allowed
        .iter()
        .map(ManagerState::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Take the exclusive advisory lock guarding a state dir.
fn acquire_state_dir_lock(state_dir: &Path) -> Result<File, std::io::Error> {
    let lock_path = state_dir.join("drover.lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    file.try_lock_exclusive().map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::WouldBlock,
            format!(
                "another supervisor holds the lock on {}",
                lock_path.display()
            ),
        )
    })?;
    Ok(file)
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
