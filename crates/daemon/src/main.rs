// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BuildOS Pipeline daemon (`buildos-pipelined`).
//!
//! Owns the `Store` and the `Scheduler`'s worker thread. The daemon binary
//! is the one place in this workspace `tokio` earns its keep: signal
//! handling is the only async work here, the scheduler/job/runner stack
//! runs entirely on plain OS threads.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;

use std::sync::Arc;

use bos_core::{display_name_from_uri, Clock, RepoId, SystemClock};
use bos_engine::Scheduler;
use bos_storage::Store;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let config = Config::load();
    info!(db_path = %config.db_path.display(), "starting buildos-pipelined");

    std::fs::create_dir_all(&config.workspaces_dir)?;

    let store = Arc::new(Store::open(&config.db_path)?);
    seed_repositories(&store, &config.serve)?;

    let scheduler = Scheduler::new(store.clone(), Arc::new(SystemClock), config.workspaces_dir.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    scheduler.shutdown();
    info!("daemon stopped");
    Ok(())
}

/// Seed the repository registry from `SERVE` the first time the database is
/// created. A non-empty registry means a prior run already seeded it.
fn seed_repositories(store: &Store, serve: &[String]) -> Result<(), bos_storage::StoreError> {
    if serve.is_empty() {
        return Ok(());
    }
    if !store.list_repositories()?.is_empty() {
        return Ok(());
    }

    let clock = SystemClock;
    for uri in serve {
        let repo_id = RepoId::generate();
        let name = display_name_from_uri(uri);
        if let Err(e) = store.create_repository(&repo_id, uri, &name, &clock.now_string()) {
            error!(uri, error = %e, "failed to seed repository from SERVE");
        }
    }
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
