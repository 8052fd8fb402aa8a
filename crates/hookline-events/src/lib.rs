// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsed-event model, event-type dispatcher, and contact/message reconciler.
//!
//! One reconciliation capability, invoked from every execution context
//! (worker pool, tests) through [`dispatch::dispatch`] with an injected
//! [`reconcile::ReconcileContext`].

pub mod dispatch;
pub mod event;
pub mod reconcile;

pub use dispatch::dispatch;
pub use event::ParsedEvent;
pub use reconcile::ReconcileContext;
