// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter recording for tasks that exhausted their retry budget.
//!
//! The queue carries only the raw body, so the audit record is located by
//! event type + exact payload (most recent match). When no matching RawEvent
//! exists a failed one is created so the failure is never silent.

use hookline_core::HooklineError;
use hookline_storage::{Database, queries};

/// Event type string parsed from a raw payload, or `"unknown"` when the
/// payload is not JSON or carries no string `type`.
pub fn payload_event_type(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Record a dead-lettered task against its RawEvent, preserving the full
/// error text for manual inspection.
pub async fn record(db: &Database, payload: &str, error: &str) -> Result<(), HooklineError> {
    let event_type = payload_event_type(payload);

    match queries::raw_events::find_latest_by_type_and_payload(db, &event_type, payload).await? {
        Some(event) => {
            queries::raw_events::mark_failed(db, &event.id, error).await?;
            tracing::error!(
                raw_event_id = %event.id,
                event_type = %event_type,
                error,
                "task dead-lettered"
            );
        }
        None => {
            let id = queries::raw_events::insert_failed(db, &event_type, payload, error).await?;
            tracing::error!(
                raw_event_id = %id,
                event_type = %event_type,
                error,
                "task dead-lettered with no matching raw event"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[test]
    fn payload_event_type_falls_back_to_unknown() {
        assert_eq!(
            payload_event_type(r#"{"type":"message.received","data":{}}"#),
            "message.received"
        );
        assert_eq!(payload_event_type(r#"{"data":{}}"#), "unknown");
        assert_eq!(payload_event_type("{corrupt"), "unknown");
    }

    #[tokio::test]
    async fn record_updates_the_matching_raw_event() {
        let (db, _dir) = setup_db().await;

        let payload = r#"{"type":"message.received","data":{"id":"msg_1"}}"#;
        let raw_id = queries::raw_events::insert(&db, "message.received", payload)
            .await
            .unwrap();

        record(&db, payload, "storage error: disk full").await.unwrap();

        let event = queries::raw_events::get(&db, &raw_id).await.unwrap().unwrap();
        assert!(!event.processed);
        assert_eq!(
            event.processing_error.as_deref(),
            Some("storage error: disk full")
        );
        assert_eq!(queries::raw_events::count(&db).await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_creates_failed_raw_event_when_no_match() {
        let (db, _dir) = setup_db().await;

        record(&db, r#"{"type":"call.completed","data":{}}"#, "boom")
            .await
            .unwrap();

        assert_eq!(queries::raw_events::count(&db).await.unwrap(), 1);
        let event = queries::raw_events::find_latest_by_type_and_payload(
            &db,
            "call.completed",
            r#"{"type":"call.completed","data":{}}"#,
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!event.processed);
        assert_eq!(event.processing_error.as_deref(), Some("boom"));

        db.close().await.unwrap();
    }
}
