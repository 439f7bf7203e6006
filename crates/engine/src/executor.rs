// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The trigger path and per-job executor.
//!
//! `trigger_job` is the single entry point for job creation, used by the
//! scheduler, the public API, and the chat managers. It returns as soon as
//! the job is persisted and `job:created` is emitted; the executor runs as
//! an independent task. Callers that need the final result await the
//! receipt's outcome.

use crate::context::FleetContext;
use drover_adapters::{LlmAdapter, QueryRequest};
use drover_core::{
    Clock, Event, FleetError, Job, JobId, MessageKind, SdkMessage, TriggerKind,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

/// Prompt used when neither the caller nor the schedule provides one.
pub const DEFAULT_PROMPT: &str = "Execute your configured task";

/// Boxed future returned by an on-message callback.
pub type MessageFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Per-message callback. The executor awaits each call before pulling the
/// next message from the stream (back-pressure).
pub type OnMessage = Arc<dyn Fn(SdkMessage) -> MessageFuture + Send + Sync>;

/// Options for one trigger call.
#[derive(Clone, Default)]
pub struct TriggerOptions {
    /// Overrides the schedule prompt and the default fallback
    pub prompt: Option<String>,
    pub bypass_concurrency_limit: bool,
    /// Streamed each SDK message in real time
    pub on_message: Option<OnMessage>,
    /// LLM session id to resume
    pub resume: Option<String>,
    /// Trigger kind recorded on the job; defaults to manual
    pub trigger: Option<TriggerKind>,
    /// Prior job the resume session came from
    pub forked_from: Option<JobId>,
}

/// Terminal result of a job's executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// What `trigger` hands back once the job is persisted.
#[derive(Debug)]
pub struct TriggerReceipt {
    pub job_id: JobId,
    pub agent: String,
    pub schedule: Option<String>,
    pub prompt: String,
    pub started_at: DateTime<Utc>,
    done: oneshot::Receiver<JobOutcome>,
}

impl TriggerReceipt {
    /// Await the executor's terminal outcome.
    pub async fn outcome(self) -> JobOutcome {
        self.done
            .await
            .unwrap_or_else(|_| JobOutcome::Failed("executor dropped".to_string()))
    }
}

struct ExecutorJob {
    job: Job,
    model: String,
    working_dir: PathBuf,
    resume: Option<String>,
    on_message: Option<OnMessage>,
}

/// Create and launch one job.
pub async fn trigger_job<L: LlmAdapter, C: Clock>(
    ctx: &FleetContext<L, C>,
    agent_name: &str,
    schedule_name: Option<&str>,
    options: TriggerOptions,
) -> Result<TriggerReceipt, FleetError> {
    let config = ctx.config();
    let agent = config
        .agent(agent_name)
        .ok_or_else(|| FleetError::agent_not_found(agent_name, config.agent_names()))?;
    let schedule = match schedule_name {
        Some(name) => Some(agent.schedule(name).ok_or_else(|| {
            FleetError::schedule_not_found(agent_name, name, agent.schedule_names())
        })?),
        None => None,
    };

    // Prompt priority: explicit option > schedule prompt > fallback
    let prompt = options
        .prompt
        .clone()
        .or_else(|| schedule.and_then(|s| s.prompt.clone()))
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    if !options.bypass_concurrency_limit {
        let current_jobs = ctx.tracker().active_count(agent_name);
        if current_jobs >= agent.max_concurrent {
            return Err(FleetError::ConcurrencyLimit {
                agent: agent_name.to_string(),
                current_jobs,
                limit: agent.max_concurrent,
            });
        }
    }

    let now = ctx.clock().now_utc();
    let job_id = ctx
        .jobs()
        .allocate_id(ctx.id_gen(), now)
        .map_err(|e| ctx.store_error(e))?;

    let trigger = options.trigger.unwrap_or(TriggerKind::Manual);
    let mut job = Job::new(job_id, agent_name, &prompt, trigger, now);
    if let Some(name) = schedule_name {
        job = job.with_schedule(name);
    }
    if let Some(origin) = &options.forked_from {
        job = job.with_forked_from(origin.clone());
    }
    ctx.jobs().write(&job).map_err(|e| ctx.store_error(e))?;

    // The slot is occupied from here until the executor releases it on a
    // terminal path.
    let cancel = ctx.tracker().begin(agent_name, &job.id);

    ctx.bus().emit(&Event::JobCreated { job: job.clone() });
    if trigger == TriggerKind::Fork {
        if let Some(resume) = &options.resume {
            ctx.bus().emit(&Event::JobForked {
                job_id: job.id.clone(),
                agent: agent_name.to_string(),
                forked_from: options.forked_from.clone(),
                session_id: resume.clone(),
            });
        }
    }

    let (done_tx, done_rx) = oneshot::channel();
    let receipt = TriggerReceipt {
        job_id: job.id.clone(),
        agent: agent_name.to_string(),
        schedule: schedule_name.map(String::from),
        prompt,
        started_at: now,
        done: done_rx,
    };

    let executor_job = ExecutorJob {
        job,
        model: agent.model.clone(),
        working_dir: agent.working_dir.clone(),
        resume: options.resume,
        on_message: options.on_message,
    };
    let ctx = ctx.clone();
    tokio::spawn(async move {
        run_job(ctx, executor_job, cancel, done_tx).await;
    });

    Ok(receipt)
}

/// Drive one job end-to-end: consume the LLM stream, persist output,
/// emit events, and land on exactly one terminal state.
async fn run_job<L: LlmAdapter, C: Clock>(
    ctx: FleetContext<L, C>,
    executor_job: ExecutorJob,
    cancel: Arc<Notify>,
    done: oneshot::Sender<JobOutcome>,
) {
    let ExecutorJob {
        mut job,
        model,
        working_dir,
        resume,
        on_message,
    } = executor_job;

    // Running for the whole streaming window
    job.mark_running();
    if let Err(e) = ctx.jobs().write(&job) {
        warn!(job_id = %job.id, error = %e, "failed to persist running status");
    }

    let request = QueryRequest {
        prompt: job.prompt.clone(),
        model,
        cwd: working_dir,
        resume,
    };
    let mut handle = match ctx.llm().query(request).await {
        Ok(handle) => handle,
        Err(e) => {
            finalize(&ctx, job, JobOutcome::Failed(e.to_string()), done);
            return;
        }
    };

    let agent = job.agent.clone();
    let outcome = loop {
        tokio::select! {
            _ = cancel.notified() => {
                debug!(job_id = %job.id, "cancelling job");
                handle.abort();
                break JobOutcome::Cancelled;
            }
            message = handle.recv() => match message {
                Some(message) => {
                    if let Err(e) = ctx.jobs().append_output(&job.id, &message) {
                        break JobOutcome::Failed(format!("failed to persist output: {e}"));
                    }
                    if job.session_id.is_none() {
                        if let Some(session_id) = message.session_id() {
                            job.record_session(session_id);
                            if let Err(e) = ctx.jobs().write(&job) {
                                warn!(job_id = %job.id, error = %e, "failed to persist session id");
                            }
                        }
                    }
                    ctx.bus().emit(&Event::JobOutput {
                        job_id: job.id.clone(),
                        agent: agent.clone(),
                        message: message.clone(),
                    });
                    if let Some(on_message) = &on_message {
                        // Await the callback before pulling the next message
                        on_message(message.clone()).await;
                    }
                    if message.kind() == MessageKind::Error {
                        break JobOutcome::Failed(
                            message.error_text().unwrap_or_else(|| "stream error".to_string()),
                        );
                    }
                }
                None => break JobOutcome::Completed,
            }
        }
    };

    finalize(&ctx, job, outcome, done);
}

/// Persist the terminal state, release the slot, then emit the terminal
/// event. The release-before-emit ordering is what keeps the concurrency
/// cap honest for subscribers that re-trigger on terminal events.
fn finalize<L: LlmAdapter, C: Clock>(
    ctx: &FleetContext<L, C>,
    mut job: Job,
    outcome: JobOutcome,
    done: oneshot::Sender<JobOutcome>,
) {
    let now = ctx.clock().now_utc();
    match &outcome {
        JobOutcome::Completed => job.complete(now),
        JobOutcome::Failed(error) => job.fail(error.clone(), now),
        JobOutcome::Cancelled => job.cancel(now),
    }
    if let Err(e) = ctx.jobs().write(&job) {
        warn!(job_id = %job.id, error = %e, "failed to persist terminal status");
    }

    ctx.tracker().finish(&job.id);

    let event = match &outcome {
        JobOutcome::Completed => Event::JobCompleted {
            job_id: job.id.clone(),
            agent: job.agent.clone(),
        },
        JobOutcome::Failed(error) => Event::JobFailed {
            job_id: job.id.clone(),
            agent: job.agent.clone(),
            error: error.clone(),
        },
        JobOutcome::Cancelled => Event::JobCancelled {
            job_id: job.id.clone(),
            agent: job.agent.clone(),
        },
    };
    ctx.bus().emit(&event);

    let _ = done.send(outcome);
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
