// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event-type dispatch: one exhaustive match routing each parsed event to
//! its reconciliation handler.

use hookline_core::{EventType, HooklineError, Outcome};
use hookline_storage::Database;

use crate::event::ParsedEvent;
use crate::reconcile::{self, ReconcileContext};

/// Route one parsed event to its handler.
///
/// Terminal conditions (unknown type, missing fields, duplicates) come back
/// as `Ok(outcome)`; only retryable failures are `Err`.
pub async fn dispatch(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    let Some(event_type) = event.event_type() else {
        return Ok(Outcome::InvalidData("missing event type".to_string()));
    };

    match event_type {
        EventType::MessageReceived => reconcile::message_received(db, ctx, event).await,
        EventType::MessageSent => reconcile::message_sent(db, ctx, event).await,
        EventType::MessageDelivered => reconcile::message_delivered(db, event).await,
        EventType::MessageFailed => reconcile::message_failed(db, event).await,
        EventType::CallCompleted => reconcile::call_completed(db, ctx, event).await,
        EventType::CallMissed => reconcile::call_missed(db, ctx, event).await,
        EventType::VoicemailReceived => reconcile::voicemail_received(db, ctx, event).await,
        EventType::Unknown(raw) => {
            tracing::debug!(event_type = %raw, "ignoring unhandled event type");
            Ok(Outcome::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn setup() -> (Database, ReconcileContext, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, ReconcileContext::new("system"), dir)
    }

    #[tokio::test]
    async fn routes_message_received_to_reconciler() {
        let (db, ctx, _dir) = setup().await;

        let event = ParsedEvent::from_value(json!({
            "type": "message.received",
            "data": { "id": "msg_1", "from": "+15551234567" }
        }));
        assert_eq!(dispatch(&db, &ctx, &event).await.unwrap(), Outcome::Processed);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_event_type_is_ignored() {
        let (db, ctx, _dir) = setup().await;

        let event = ParsedEvent::from_value(json!({
            "type": "contact.updated",
            "data": { "id": "ct_1" }
        }));
        assert_eq!(dispatch(&db, &ctx, &event).await.unwrap(), Outcome::Ignored);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_type_is_invalid_data() {
        let (db, ctx, _dir) = setup().await;

        let event = ParsedEvent::from_value(json!({ "data": { "id": "msg_1" } }));
        let outcome = dispatch(&db, &ctx, &event).await.unwrap();
        assert!(matches!(outcome, Outcome::InvalidData(_)));

        db.close().await.unwrap();
    }
}
