// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `drover jobs` - inspect and prune persisted jobs.

use crate::output::render_table;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use drover_core::{format_elapsed, JobId, JobStatus};
use drover_engine::{JobFilter, JobManager};
use drover_storage::{JobStore, RetentionPolicy};
use std::path::Path;

#[derive(Args)]
pub struct JobsArgs {
    #[command(subcommand)]
    command: JobsCommand,
}

#[derive(Subcommand)]
enum JobsCommand {
    /// List persisted jobs, newest first
    List {
        #[arg(long)]
        agent: Option<String>,
        /// pending | running | completed | failed | cancelled
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one job's metadata (and optionally its output)
    Show {
        id: String,
        /// Include the full output log
        #[arg(long)]
        output: bool,
    },
    /// Delete old jobs beyond the retention caps
    Prune {
        #[arg(long, default_value_t = 100)]
        max_per_agent: usize,
        /// 0 means no fleet-wide cap
        #[arg(long, default_value_t = 0)]
        max_total: usize,
    },
}

fn parse_status(raw: &str) -> Result<JobStatus> {
    match raw {
        "pending" => Ok(JobStatus::Pending),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        "cancelled" => Ok(JobStatus::Cancelled),
        other => bail!("unknown status '{other}'"),
    }
}

fn open_manager(state_dir: &Path) -> Result<JobManager> {
    let store = JobStore::open(state_dir)
        .with_context(|| format!("open state dir {}", state_dir.display()))?;
    Ok(JobManager::new(store, state_dir.to_path_buf()))
}

pub async fn run(state_dir: &Path, args: JobsArgs) -> Result<()> {
    let manager = open_manager(state_dir)?;

    match args.command {
        JobsCommand::List {
            agent,
            status,
            limit,
        } => {
            let filter = JobFilter {
                agent,
                status: status.as_deref().map(parse_status).transpose()?,
                limit: Some(limit),
                ..Default::default()
            };
            let page = manager.get_jobs(&filter)?;

            let rows: Vec<Vec<String>> = page
                .jobs
                .iter()
                .map(|job| {
                    let duration = job
                        .finished_at
                        .map(|end| {
                            let secs =
                                end.signed_duration_since(job.started_at).num_seconds();
                            format_elapsed(secs.max(0) as u64)
                        })
                        .unwrap_or_else(|| "-".to_string());
                    vec![
                        job.id.to_string(),
                        job.agent.clone(),
                        job.status.to_string(),
                        job.trigger.to_string(),
                        job.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        duration,
                    ]
                })
                .collect();

            print!(
                "{}",
                render_table(
                    &["ID", "AGENT", "STATUS", "TRIGGER", "STARTED", "DURATION"],
                    &rows
                )
            );
            if page.total > page.jobs.len() {
                println!("({} of {} jobs shown)", page.jobs.len(), page.total);
            }
            if page.errors > 0 {
                eprintln!("warning: {} unreadable metadata file(s) skipped", page.errors);
            }
            Ok(())
        }
        JobsCommand::Show { id, output } => {
            let (job, messages) = manager.get_job(&JobId::new(id), output)?;
            print!("{}", serde_yaml::to_string(&job)?);
            if let Some(messages) = messages {
                println!("---");
                for message in messages {
                    println!("{}", serde_json::to_string(&message)?);
                }
            }
            Ok(())
        }
        JobsCommand::Prune {
            max_per_agent,
            max_total,
        } => {
            let deleted = manager.apply_retention(&RetentionPolicy {
                max_jobs_per_agent: max_per_agent,
                max_total_jobs: max_total,
            })?;
            println!("deleted {deleted} job(s)");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
