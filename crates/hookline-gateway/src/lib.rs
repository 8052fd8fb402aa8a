// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP ingestion gateway for provider webhooks.
//!
//! Receives untrusted callbacks, verifies their HMAC signature, persists the
//! raw payload, and hands off to the task queue within the fast-acknowledge
//! budget. All reconciliation happens asynchronously in `hookline-queue`.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, router, start_server};
