// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for crash-safe webhook task processing.
//!
//! State machine per entry: pending -> processing -> completed, or
//! pending -> processing -> pending (retry, eligible after `next_attempt_at`),
//! or pending -> processing -> failed (dead-letter, terminal). A processing
//! entry whose `locked_until` has passed belongs to a worker that died
//! mid-task; `dequeue` moves it back to pending, counting the lost claim as
//! an attempt, before selecting.

use hookline_core::HooklineError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{FailDisposition, QueueEntry};

const COLUMNS: &str = "id, queue_name, payload, status, attempts, max_attempts, \
                       next_attempt_at, last_error, created_at, updated_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    Ok(QueueEntry {
        id: row.get(0)?,
        queue_name: row.get(1)?,
        payload: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        next_attempt_at: row.get(6)?,
        last_error: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Enqueue a new item. Returns the auto-generated queue entry ID.
///
/// The payload is queued byte-for-byte as received and re-parsed only by
/// the worker.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    max_attempts: u32,
) -> Result<i64, HooklineError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, max_attempts) VALUES (?1, ?2, ?3)",
                params![queue_name, payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Dequeue the next eligible pending entry from the named queue.
///
/// Atomically selects the oldest pending entry whose backoff delay (if any)
/// has elapsed and marks it as "processing" with a 5-minute lock timeout.
/// Expired processing claims are first returned to pending (their lost claim
/// counted as an attempt) so a worker crash never strands an entry.
/// Returns `None` if nothing is eligible.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, HooklineError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            // Transaction to atomically recover, find, and claim.
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE queue SET status = 'pending',
                 attempts = attempts + 1,
                 last_error = 'claim expired before the task settled',
                 locked_until = NULL,
                 next_attempt_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1
                   AND status = 'processing'
                   AND locked_until <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![queue_name],
            )?;

            let result = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {COLUMNS} FROM queue
                     WHERE queue_name = ?1
                       AND status = 'pending'
                       AND (next_attempt_at IS NULL
                            OR next_attempt_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY id ASC
                     LIMIT 1"
                ))?;
                stmt.query_row(params![queue_name], row_to_entry)
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    tx.commit()?;

                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Acknowledge successful (terminal) processing of a queue entry.
pub async fn ack(db: &Database, id: i64) -> Result<(), HooklineError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed',
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt for a queue entry.
///
/// Increments attempts. If the retry budget is exhausted the entry becomes
/// terminally `failed` (dead-letter); otherwise it returns to `pending` and
/// becomes eligible again only after `retry_delay_secs`.
pub async fn fail(
    db: &Database,
    id: i64,
    error: &str,
    retry_delay_secs: u64,
) -> Result<FailDisposition, HooklineError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i64, i64) = conn.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE queue SET status = 'failed', attempts = ?1,
                     last_error = ?2,
                     next_attempt_at = NULL,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3",
                    params![new_attempts, error, id],
                )?;
                Ok(FailDisposition::DeadLettered {
                    attempts: new_attempts,
                })
            } else {
                let delay_modifier = format!("+{retry_delay_secs} seconds");
                conn.execute(
                    "UPDATE queue SET status = 'pending', attempts = ?1,
                     last_error = ?2,
                     next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?4",
                    params![new_attempts, error, delay_modifier, id],
                )?;
                Ok(FailDisposition::Retrying {
                    attempts: new_attempts,
                })
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a queue entry by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<QueueEntry>, HooklineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM queue WHERE id = ?1"))?;
            let mut rows = stmt.query_map(params![id], row_to_entry)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Number of entries with the given status in the named queue.
pub async fn count_by_status(
    db: &Database,
    queue_name: &str,
    status: &str,
) -> Result<i64, HooklineError> {
    let queue_name = queue_name.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM queue WHERE queue_name = ?1 AND status = ?2",
                params![queue_name, status],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
