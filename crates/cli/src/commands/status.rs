// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `drover status` - offline summary of the state directory.

use crate::output::render_table;
use anyhow::{Context, Result};
use drover_core::JobStatus;
use drover_storage::JobStore;
use std::collections::BTreeMap;
use std::path::Path;

pub fn run(state_dir: &Path) -> Result<()> {
    let store = JobStore::open(state_dir)
        .with_context(|| format!("open state dir {}", state_dir.display()))?;
    let (mut jobs, errors) = store.load_all()?;

    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_agent: BTreeMap<String, usize> = BTreeMap::new();
    let mut in_flight = 0;
    for job in &jobs {
        *by_status.entry(job.status.to_string()).or_insert(0) += 1;
        *by_agent.entry(job.agent.clone()).or_insert(0) += 1;
        if matches!(job.status, JobStatus::Pending | JobStatus::Running) {
            in_flight += 1;
        }
    }

    println!("state dir: {}", state_dir.display());
    println!("jobs: {} ({} in flight)", jobs.len(), in_flight);
    for (status, count) in &by_status {
        println!("  {status}: {count}");
    }
    println!("agents:");
    for (agent, count) in &by_agent {
        println!("  {agent}: {count} job(s)");
    }
    if errors > 0 {
        eprintln!("warning: {errors} unreadable metadata file(s) skipped");
    }

    jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    let rows: Vec<Vec<String>> = jobs
        .iter()
        .take(5)
        .map(|job| {
            vec![
                job.id.to_string(),
                job.agent.clone(),
                job.status.to_string(),
                job.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    if !rows.is_empty() {
        println!("recent:");
        print!("{}", render_table(&["ID", "AGENT", "STATUS", "STARTED"], &rows));
    }

    Ok(())
}
