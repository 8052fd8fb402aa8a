// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.

use serde::{Deserialize, Serialize};

/// Durable record of every accepted webhook delivery.
///
/// The payload is stored byte-for-byte as received, before any validation,
/// so failed or invalid events remain inspectable. Rows are immutable after
/// creation except for the processing-outcome fields, and are never deleted
/// by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub event_type: String,
    pub payload: String,
    pub processed: bool,
    pub processed_at: Option<String>,
    pub processing_error: Option<String>,
    pub created_at: String,
}

/// A phone-number-addressable party.
///
/// Phone numbers are stored in canonical `+<digits>` form and are unique per
/// owner. Contacts created from webhook traffic belong to the configured
/// system owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub phone_number: String,
    pub display_name: Option<String>,
    pub owner_id: String,
    pub opted_out: bool,
    pub created_at: String,
}

/// One unit of communication: an SMS, a call, or a voicemail.
///
/// `external_id` is the provider's identifier and the idempotency key; the
/// schema enforces its global uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub external_id: String,
    pub contact_id: String,
    pub direction: String,
    pub kind: String,
    pub status: String,
    pub body: Option<String>,
    pub duration_secs: Option<i64>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub received_at: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: String,
}

/// Field set for creating a new Message row.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub external_id: String,
    pub contact_id: String,
    pub direction: String,
    pub kind: String,
    pub status: String,
    pub body: Option<String>,
    pub duration_secs: Option<i64>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub received_at: Option<String>,
    pub error_detail: Option<String>,
}

/// A claimed or pending entry in the durable task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub next_attempt_at: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What [`crate::queries::queue::fail`] decided for a failed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailDisposition {
    /// The entry went back to pending and becomes eligible after the delay.
    Retrying { attempts: i64 },
    /// The retry budget is exhausted; the entry is terminally failed.
    DeadLettered { attempts: i64 },
}
