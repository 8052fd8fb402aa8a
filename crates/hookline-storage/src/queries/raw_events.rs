// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw event (Event Store) operations.
//!
//! Raw events are the append-only audit and dead-letter record: created on
//! every accepted delivery, mutated only when the retry worker reaches a
//! terminal outcome, never deleted here.

use hookline_core::HooklineError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::RawEvent;

/// Upper bound on stored processing-error text.
const MAX_ERROR_LEN: usize = 1024;

const COLUMNS: &str =
    "id, event_type, payload, processed, processed_at, processing_error, created_at";

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<RawEvent, rusqlite::Error> {
    Ok(RawEvent {
        id: row.get(0)?,
        event_type: row.get(1)?,
        payload: row.get(2)?,
        processed: row.get::<_, i64>(3)? != 0,
        processed_at: row.get(4)?,
        processing_error: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn truncate_error(error: &str) -> String {
    if error.len() <= MAX_ERROR_LEN {
        return error.to_string();
    }
    let mut end = MAX_ERROR_LEN;
    while !error.is_char_boundary(end) {
        end -= 1;
    }
    error[..end].to_string()
}

/// Persist a newly accepted delivery with `processed = false`.
/// The payload is stored verbatim. Returns the generated row id.
pub async fn insert(
    db: &Database,
    event_type: &str,
    payload: &str,
) -> Result<String, HooklineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let row_id = id.clone();
    let event_type = event_type.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO raw_events (id, event_type, payload) VALUES (?1, ?2, ?3)",
                params![row_id, event_type, payload],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Mark a raw event as processed, optionally recording a terminal warning
/// (invalid-data events stay inspectable through `processing_error`).
pub async fn mark_processed(
    db: &Database,
    id: &str,
    warning: Option<&str>,
) -> Result<(), HooklineError> {
    let id = id.to_string();
    let warning = warning.map(truncate_error);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE raw_events
                 SET processed = 1,
                     processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     processing_error = ?2
                 WHERE id = ?1",
                params![id, warning],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a terminal failure on an existing raw event (dead-letter path).
/// The row keeps `processed = false` so it surfaces for manual review.
pub async fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), HooklineError> {
    let id = id.to_string();
    let error = truncate_error(error);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE raw_events
                 SET processed = 0,
                     processed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     processing_error = ?2
                 WHERE id = ?1",
                params![id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Create a raw event directly in a failed state.
///
/// Used when a task dead-letters but no matching raw event exists.
pub async fn insert_failed(
    db: &Database,
    event_type: &str,
    payload: &str,
    error: &str,
) -> Result<String, HooklineError> {
    let id = uuid::Uuid::new_v4().to_string();
    let row_id = id.clone();
    let event_type = event_type.to_string();
    let payload = payload.to_string();
    let error = truncate_error(error);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO raw_events
                     (id, event_type, payload, processed, processed_at, processing_error)
                 VALUES (?1, ?2, ?3, 0, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), ?4)",
                params![row_id, event_type, payload, error],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Find the most recent raw event with the given type and exact payload.
///
/// The queue carries only the raw body, so terminal outcomes locate their
/// audit record this way rather than by foreign key.
pub async fn find_latest_by_type_and_payload(
    db: &Database,
    event_type: &str,
    payload: &str,
) -> Result<Option<RawEvent>, HooklineError> {
    let event_type = event_type.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM raw_events
                 WHERE event_type = ?1 AND payload = ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![event_type, payload], row_to_event)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one raw event by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<RawEvent>, HooklineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM raw_events WHERE id = ?1"))?;
            let mut rows = stmt.query_map(params![id], row_to_event)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of raw events.
pub async fn count(db: &Database) -> Result<i64, HooklineError> {
    db.connection()
        .call(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM raw_events", [], |row| row.get(0))?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
