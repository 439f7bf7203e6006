// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `drover start` - run the fleet in the foreground.

use crate::{logging, runtime, watch};
use anyhow::{Context, Result};
use clap::Args;
use drover_adapters::ConnectorRegistry;
use drover_chat::{DiscordManager, SlackManager};
use drover_engine::{FleetManager, StopOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Quiet period after a config-file change before reloading.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Args)]
pub struct StartArgs {
    /// Reload the config when its files change
    #[arg(long)]
    watch: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Seconds to wait for in-flight jobs at shutdown
    #[arg(long, default_value_t = 30)]
    stop_timeout: u64,
}

pub async fn run(config: &Path, state_dir: &Path, args: StartArgs) -> Result<()> {
    let _log_guard = logging::init(args.log_file.as_deref())?;

    // Chat platforms plug in through the connector registry; with no
    // registered platform libraries the managers initialize to no-ops.
    let registry = ConnectorRegistry::new();
    let manager = FleetManager::new(config, state_dir, runtime::adapter_from_env())
        .with_state_dir_lock()
        .with_chat_manager(Arc::new(DiscordManager::new(registry.clone())))
        .with_chat_manager(Arc::new(SlackManager::new(registry)));

    manager.initialize().await?;
    manager.start().await?;
    info!(config = %config.display(), state_dir = %state_dir.display(), "drover running");

    let mut sighup = signal(SignalKind::hangup()).context("install SIGHUP handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;

    let (watch_tx, mut watch_rx) = mpsc::channel(1);
    let _watcher = if args.watch {
        let config_dir = manager
            .get_config()
            .map(|c| c.config_dir.clone())
            .unwrap_or_else(|| config.parent().unwrap_or(Path::new(".")).to_path_buf());
        Some(watch::spawn(&config_dir, watch_tx).context("start config watcher")?)
    } else {
        None
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received; shutting down");
                break;
            }
            _ = sighup.recv() => {
                info!("SIGHUP received; reloading configuration");
                reload(&manager).await;
            }
            Some(()) = watch_rx.recv() => {
                // Editors fire bursts of events per save
                tokio::time::sleep(WATCH_DEBOUNCE).await;
                while watch_rx.try_recv().is_ok() {}
                info!("config change detected; reloading");
                reload(&manager).await;
            }
        }
    }

    manager
        .stop(StopOptions {
            timeout: Duration::from_secs(args.stop_timeout),
            cancel_on_timeout: true,
            cancel_timeout: Duration::from_secs(10),
        })
        .await?;
    Ok(())
}

async fn reload<L, C>(manager: &FleetManager<L, C>)
where
    L: drover_adapters::LlmAdapter,
    C: drover_core::Clock,
{
    match manager.reload().await {
        Ok(changes) if changes.is_empty() => info!("configuration unchanged"),
        Ok(changes) => {
            for change in &changes {
                info!(
                    change = ?change.change,
                    category = ?change.category,
                    name = %change.name,
                    "config change applied"
                );
            }
        }
        Err(e) => warn!(error = %e, "reload failed; previous configuration kept"),
    }
}
