// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry worker pool and dead-letter handling for the webhook task queue.

pub mod backoff;
pub mod deadletter;
pub mod worker;

pub use worker::{WEBHOOK_QUEUE, WorkerPool, run_pending_once, spawn_workers};
