// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hookline serve` command implementation.
//!
//! Starts the SQLite-backed event store, the retry worker pool, and the
//! ingestion gateway, then runs until SIGTERM/SIGINT. Shutdown cancels the
//! workers and lets in-flight tasks settle; anything still claimed is
//! recovered by the queue's lock timeout on the next start.

use hookline_config::model::HooklineConfig;
use hookline_core::HooklineError;
use hookline_events::ReconcileContext;
use hookline_gateway::{GatewayState, start_server};
use hookline_queue::spawn_workers;
use hookline_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Runs the `hookline serve` command.
pub async fn run_serve(config: HooklineConfig) -> Result<(), HooklineError> {
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting hookline serve");

    if config.webhook.signing_secret.is_none() {
        warn!("no signing secret configured; every webhook post will be rejected");
    }

    let db = Database::open(&config.storage.database_path).await?;
    info!(path = config.storage.database_path.as_str(), "storage ready");

    let cancel = install_signal_handler();

    let ctx = ReconcileContext::new(config.webhook.system_owner.clone());
    let pool = spawn_workers(db.clone(), ctx, config.queue.clone(), cancel.clone());

    let state = GatewayState {
        db: db.clone(),
        signing_secret: config.webhook.signing_secret.clone(),
        timestamp_tolerance_secs: config.webhook.timestamp_tolerance_secs,
        max_attempts: config.queue.max_attempts,
    };

    tokio::select! {
        result = start_server(&config.gateway.host, config.gateway.port, state) => {
            result?;
        }
        _ = cancel.cancelled() => {
            info!("shutdown signal received, stopping gateway");
        }
    }

    pool.shutdown().await;
    db.close().await?;

    info!("hookline serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hookline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
