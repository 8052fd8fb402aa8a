// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Hookline pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Provider event kinds the pipeline knows how to reconcile.
///
/// Routing is an exhaustive match over this type; a provider event type the
/// pipeline does not recognize parses into `Unknown` and is acknowledged
/// without processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
pub enum EventType {
    #[strum(serialize = "message.received")]
    MessageReceived,
    #[strum(serialize = "message.delivered")]
    MessageDelivered,
    #[strum(serialize = "message.sent")]
    MessageSent,
    #[strum(serialize = "message.failed")]
    MessageFailed,
    #[strum(serialize = "call.completed")]
    CallCompleted,
    #[strum(serialize = "call.missed")]
    CallMissed,
    #[strum(serialize = "voicemail.received")]
    VoicemailReceived,
    /// Any event type not listed above, carrying the raw type string.
    #[strum(default)]
    Unknown(String),
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::MessageReceived => write!(f, "message.received"),
            EventType::MessageDelivered => write!(f, "message.delivered"),
            EventType::MessageSent => write!(f, "message.sent"),
            EventType::MessageFailed => write!(f, "message.failed"),
            EventType::CallCompleted => write!(f, "call.completed"),
            EventType::CallMissed => write!(f, "call.missed"),
            EventType::VoicemailReceived => write!(f, "voicemail.received"),
            EventType::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

impl EventType {
    /// Parse a provider type string. Never fails; unrecognized strings map
    /// to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        raw.parse()
            .unwrap_or_else(|_| EventType::Unknown(raw.to_string()))
    }

    /// Whether this event creates a Message (as opposed to updating one).
    pub fn is_creation(&self) -> bool {
        matches!(
            self,
            EventType::MessageReceived
                | EventType::MessageSent
                | EventType::CallCompleted
                | EventType::CallMissed
                | EventType::VoicemailReceived
        )
    }
}

/// Terminal result of dispatching one parsed event.
///
/// Retryable failures are not an `Outcome`; they propagate as
/// [`crate::HooklineError`] so the worker can schedule a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event was reconciled into the contact/message store.
    Processed,
    /// A Message with this external id already exists; nothing was mutated.
    Duplicate,
    /// Required fields were absent. Terminal: the data will never become valid.
    InvalidData(String),
    /// A status update arrived before its creation event. Terminal, non-fatal.
    NotFound,
    /// The event type is not one this pipeline handles.
    Ignored,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Processed => write!(f, "processed"),
            Outcome::Duplicate => write!(f, "duplicate"),
            Outcome::InvalidData(reason) => write!(f, "invalid_data: {reason}"),
            Outcome::NotFound => write!(f, "not_found"),
            Outcome::Ignored => write!(f, "ignored"),
        }
    }
}

/// Direction of a message relative to the owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// The kind of communication unit a Message row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    Sms,
    Call,
    Voicemail,
}

/// Normalize a phone number to a canonical `+<digits>` international form.
///
/// Accepts common human formatting (spaces, dashes, dots, parentheses).
/// Bare 10-digit numbers are treated as NANP and prefixed `+1`; 11-digit
/// numbers starting with 1 likewise. Returns `None` when the input cannot
/// be a phone number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    // Reject anything with characters other than digits and formatting.
    let ok_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')'));
    if !ok_chars {
        return None;
    }

    if has_plus {
        if (8..=15).contains(&digits.len()) {
            return Some(format!("+{digits}"));
        }
        return None;
    }

    match digits.len() {
        10 => Some(format!("+1{digits}")),
        11 if digits.starts_with('1') => Some(format!("+{digits}")),
        8..=15 => Some(format!("+{digits}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_parses_known_strings() {
        assert_eq!(EventType::parse("message.received"), EventType::MessageReceived);
        assert_eq!(EventType::parse("message.delivered"), EventType::MessageDelivered);
        assert_eq!(EventType::parse("message.sent"), EventType::MessageSent);
        assert_eq!(EventType::parse("message.failed"), EventType::MessageFailed);
        assert_eq!(EventType::parse("call.completed"), EventType::CallCompleted);
        assert_eq!(EventType::parse("call.missed"), EventType::CallMissed);
        assert_eq!(EventType::parse("voicemail.received"), EventType::VoicemailReceived);
    }

    #[test]
    fn event_type_unknown_preserves_raw_string() {
        let parsed = EventType::parse("contact.updated");
        assert_eq!(parsed, EventType::Unknown("contact.updated".to_string()));
        assert_eq!(parsed.to_string(), "contact.updated");
    }

    #[test]
    fn event_type_display_round_trips() {
        let all = [
            EventType::MessageReceived,
            EventType::MessageDelivered,
            EventType::MessageSent,
            EventType::MessageFailed,
            EventType::CallCompleted,
            EventType::CallMissed,
            EventType::VoicemailReceived,
        ];
        for ty in all {
            assert_eq!(EventType::parse(&ty.to_string()), ty);
        }
    }

    #[test]
    fn creation_events_are_flagged() {
        assert!(EventType::MessageReceived.is_creation());
        assert!(EventType::VoicemailReceived.is_creation());
        assert!(!EventType::MessageDelivered.is_creation());
        assert!(!EventType::MessageFailed.is_creation());
    }

    #[test]
    fn normalize_phone_canonical_forms() {
        assert_eq!(normalize_phone("+15551234567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("(555) 123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("1-555-123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(normalize_phone("+44 20 7946 0958").as_deref(), Some("+442079460958"));
        assert_eq!(normalize_phone("555.123.4567").as_deref(), Some("+15551234567"));
    }

    #[test]
    fn normalize_phone_rejects_garbage() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("not a number"), None);
        assert_eq!(normalize_phone("123"), None);
        assert_eq!(normalize_phone("+1"), None);
    }

    #[test]
    fn direction_and_kind_serialize_lowercase() {
        assert_eq!(Direction::Inbound.to_string(), "inbound");
        assert_eq!(Direction::Outbound.to_string(), "outbound");
        assert_eq!(MessageKind::Sms.to_string(), "sms");
        assert_eq!(MessageKind::Voicemail.to_string(), "voicemail");
    }
}
