// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.
//!
//! The `UNIQUE (external_id)` constraint is the idempotency boundary:
//! creation is a single `ON CONFLICT DO NOTHING` insert, so duplicate
//! deliveries of the same provider event never produce a second row no
//! matter how many workers race on them.

use hookline_core::HooklineError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{Message, NewMessage};

const COLUMNS: &str = "id, external_id, contact_id, direction, kind, status, body, \
                       duration_secs, from_number, to_number, sent_at, delivered_at, \
                       received_at, error_detail, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        external_id: row.get(1)?,
        contact_id: row.get(2)?,
        direction: row.get(3)?,
        kind: row.get(4)?,
        status: row.get(5)?,
        body: row.get(6)?,
        duration_secs: row.get(7)?,
        from_number: row.get(8)?,
        to_number: row.get(9)?,
        sent_at: row.get(10)?,
        delivered_at: row.get(11)?,
        received_at: row.get(12)?,
        error_detail: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// Insert a message unless one with the same external id already exists.
///
/// Returns `true` if a row was created, `false` if the external id was
/// already present (duplicate delivery).
pub async fn insert_if_absent(db: &Database, msg: NewMessage) -> Result<bool, HooklineError> {
    let id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT INTO messages
                     (id, external_id, contact_id, direction, kind, status, body,
                      duration_secs, from_number, to_number, sent_at, delivered_at,
                      received_at, error_detail)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT (external_id) DO NOTHING",
                params![
                    id,
                    msg.external_id,
                    msg.contact_id,
                    msg.direction,
                    msg.kind,
                    msg.status,
                    msg.body,
                    msg.duration_secs,
                    msg.from_number,
                    msg.to_number,
                    msg.sent_at,
                    msg.delivered_at,
                    msg.received_at,
                    msg.error_detail,
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Update the status of the message with this external id, touching only the
/// fields the event carries: a new delivery/send timestamp and/or an error
/// detail. Returns `false` when no such message exists (out-of-order
/// delivery: the status update arrived before its creation event).
pub async fn update_status(
    db: &Database,
    external_id: &str,
    status: &str,
    delivered_at: Option<String>,
    error_detail: Option<String>,
) -> Result<bool, HooklineError> {
    let external_id = external_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages
                 SET status = ?2,
                     delivered_at = COALESCE(?3, delivered_at),
                     error_detail = COALESCE(?4, error_detail)
                 WHERE external_id = ?1",
                params![external_id, status, delivered_at, error_detail],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by the provider's external id.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Message>, HooklineError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages WHERE external_id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![external_id], row_to_message)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of messages.
pub async fn count(db: &Database) -> Result<i64, HooklineError> {
    db.connection()
        .call(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
