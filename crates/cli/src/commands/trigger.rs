// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `drover trigger` - one-shot job execution.

use crate::{logging, runtime};
use anyhow::{bail, Result};
use clap::Args;
use drover_chat::extract_message_content;
use drover_engine::{FleetManager, JobOutcome, OnMessage, TriggerOptions};
use std::path::Path;
use std::sync::Arc;

#[derive(Args)]
pub struct TriggerArgs {
    /// Agent to run
    agent: String,

    /// Schedule whose prompt to use
    schedule: Option<String>,

    /// Prompt override
    #[arg(long)]
    prompt: Option<String>,

    /// Print streamed output while the job runs
    #[arg(long)]
    follow: bool,

    /// Ignore the agent's max_concurrent cap
    #[arg(long)]
    bypass_limit: bool,
}

pub async fn run(config: &Path, state_dir: &Path, args: TriggerArgs) -> Result<()> {
    let _log_guard = logging::init(None)?;

    let manager = FleetManager::new(config, state_dir, runtime::adapter_from_env());
    manager.initialize().await?;

    let on_message: Option<OnMessage> = args.follow.then(|| {
        Arc::new(|message: drover_core::SdkMessage| {
            Box::pin(async move {
                if let Some(text) = extract_message_content(&message) {
                    println!("{text}");
                }
            }) as drover_engine::executor::MessageFuture
        }) as OnMessage
    });

    let receipt = manager
        .trigger(
            &args.agent,
            args.schedule.as_deref(),
            TriggerOptions {
                prompt: args.prompt,
                bypass_concurrency_limit: args.bypass_limit,
                on_message,
                ..Default::default()
            },
        )
        .await?;

    println!("job {} started for agent {}", receipt.job_id, receipt.agent);
    match receipt.outcome().await {
        JobOutcome::Completed => {
            println!("job completed");
            Ok(())
        }
        JobOutcome::Failed(error) => bail!("job failed: {error}"),
        JobOutcome::Cancelled => bail!("job cancelled"),
    }
}
