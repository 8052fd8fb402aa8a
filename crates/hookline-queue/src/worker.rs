// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry worker pool.
//!
//! N independent tokio tasks poll the durable queue, run the dispatcher on
//! each claimed entry under a per-task timeout, and translate the outcome
//! into the queue/raw-event state machine: terminal outcomes complete the
//! task, retryable errors reschedule it with exponential backoff until the
//! attempt budget is spent and the task dead-letters.

use std::time::Duration;

use hookline_config::model::QueueConfig;
use hookline_core::{HooklineError, Outcome};
use hookline_events::{ParsedEvent, ReconcileContext, dispatch};
use hookline_storage::models::FailDisposition;
use hookline_storage::{Database, QueueEntry, queries};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::retry_delay_secs;
use crate::deadletter;

/// Queue name all webhook deliveries flow through.
pub const WEBHOOK_QUEUE: &str = "webhooks";

/// Handle to a running pool of retry workers.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Token that stops every worker when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all workers and wait for them to exit. In-flight tasks run to
    /// their outcome; claimed-but-unfinished work is recovered by the queue's
    /// lock timeout on the next start.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked during shutdown");
            }
        }
        info!("worker pool shut down");
    }
}

/// Spawn the configured number of workers against the webhook queue.
pub fn spawn_workers(
    db: Database,
    ctx: ReconcileContext,
    cfg: QueueConfig,
    cancel: CancellationToken,
) -> WorkerPool {
    let mut handles = Vec::with_capacity(cfg.workers);
    for worker_id in 0..cfg.workers {
        let db = db.clone();
        let ctx = ctx.clone();
        let cfg = cfg.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, db, ctx, cfg, cancel).await;
        }));
    }
    info!(workers = handles.len(), "retry workers started");
    WorkerPool { cancel, handles }
}

async fn worker_loop(
    worker_id: usize,
    db: Database,
    ctx: ReconcileContext,
    cfg: QueueConfig,
    cancel: CancellationToken,
) {
    let poll_interval = Duration::from_millis(cfg.poll_interval_ms);
    debug!(worker_id, "worker started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match queries::queue::dequeue(&db, WEBHOOK_QUEUE).await {
            Ok(Some(entry)) => {
                if let Err(e) = process_entry(&db, &ctx, &cfg, &entry).await {
                    // Bookkeeping itself failed; the claim lock will expire
                    // and the entry will be retried.
                    error!(worker_id, task_id = entry.id, error = %e, "task bookkeeping failed");
                }
            }
            Ok(None) => {
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = cancel.cancelled() => break,
                }
            }
            Err(e) => {
                error!(worker_id, error = %e, "queue poll failed");
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }
    }

    debug!(worker_id, "worker stopped");
}

/// Run the dispatcher on one claimed entry and settle it.
pub async fn process_entry(
    db: &Database,
    ctx: &ReconcileContext,
    cfg: &QueueConfig,
    entry: &QueueEntry,
) -> Result<(), HooklineError> {
    match run_dispatch(db, ctx, cfg, entry).await {
        Ok(outcome) => apply_outcome(db, entry, outcome).await,
        Err(err) => apply_failure(db, cfg, entry, &err).await,
    }
}

async fn run_dispatch(
    db: &Database,
    ctx: &ReconcileContext,
    cfg: &QueueConfig,
    entry: &QueueEntry,
) -> Result<Outcome, HooklineError> {
    // A payload that is not JSON will never become JSON; terminal.
    let event = match ParsedEvent::from_json(&entry.payload) {
        Ok(event) => event,
        Err(e) => return Ok(Outcome::InvalidData(format!("malformed payload JSON: {e}"))),
    };

    let budget = Duration::from_secs(cfg.task_timeout_secs);
    match tokio::time::timeout(budget, dispatch(db, ctx, &event)).await {
        Ok(result) => result,
        Err(_) => Err(HooklineError::Timeout { duration: budget }),
    }
}

/// Complete a task that reached a terminal outcome, and mark its RawEvent
/// processed (invalid-data outcomes keep the reason as a warning).
async fn apply_outcome(
    db: &Database,
    entry: &QueueEntry,
    outcome: Outcome,
) -> Result<(), HooklineError> {
    let warning = match &outcome {
        Outcome::InvalidData(reason) => {
            warn!(task_id = entry.id, reason, "event data invalid, completed with warning");
            Some(reason.clone())
        }
        Outcome::NotFound => {
            info!(task_id = entry.id, "status update had no target message");
            None
        }
        _ => None,
    };

    queries::queue::ack(db, entry.id).await?;

    let event_type = deadletter::payload_event_type(&entry.payload);
    if let Some(raw_event) =
        queries::raw_events::find_latest_by_type_and_payload(db, &event_type, &entry.payload)
            .await?
    {
        queries::raw_events::mark_processed(db, &raw_event.id, warning.as_deref()).await?;
    }

    debug!(task_id = entry.id, outcome = %outcome, "task completed");
    Ok(())
}

/// Reschedule a task that failed retryably, or dead-letter it once the
/// attempt budget is exhausted.
async fn apply_failure(
    db: &Database,
    cfg: &QueueConfig,
    entry: &QueueEntry,
    err: &HooklineError,
) -> Result<(), HooklineError> {
    let delay = retry_delay_secs(entry.attempts, cfg.retry_base_secs, cfg.retry_cap_secs);
    let error_text = err.to_string();

    match queries::queue::fail(db, entry.id, &error_text, delay).await? {
        FailDisposition::Retrying { attempts } => {
            warn!(
                task_id = entry.id,
                attempts,
                delay_secs = delay,
                error = %error_text,
                "task failed, retry scheduled"
            );
        }
        FailDisposition::DeadLettered { attempts } => {
            deadletter::record(db, &entry.payload, &error_text).await?;
            debug!(task_id = entry.id, attempts, "retry budget exhausted");
        }
    }
    Ok(())
}

/// Drain every currently eligible pending entry, returning how many were
/// processed. Used in place of the polling workers where deterministic
/// completion matters.
pub async fn run_pending_once(
    db: &Database,
    ctx: &ReconcileContext,
    cfg: &QueueConfig,
) -> Result<usize, HooklineError> {
    let mut processed = 0;
    while let Some(entry) = queries::queue::dequeue(db, WEBHOOK_QUEUE).await? {
        process_entry(db, ctx, cfg, &entry).await?;
        processed += 1;
    }
    Ok(processed)
}
