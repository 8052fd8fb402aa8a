// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hookline webhook pipeline.
//!
//! Provides the workspace-wide error type and the domain types shared by the
//! gateway, dispatcher, reconciler, and retry worker: the provider event-type
//! sum type, the dispatch outcome enum, and phone-number normalization.

pub mod error;
pub mod types;

pub use error::HooklineError;
pub use types::{Direction, EventType, MessageKind, Outcome, normalize_phone};
