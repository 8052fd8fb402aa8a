// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact operations.
//!
//! Contact creation is constraint-backed, not read-then-write: the insert is
//! a single `ON CONFLICT DO NOTHING` statement, so a concurrent duplicate
//! delivery hitting the `(owner_id, phone_number)` uniqueness constraint is
//! a benign race and the follow-up read returns whichever row won.

use hookline_core::HooklineError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::Contact;

const COLUMNS: &str = "id, phone_number, display_name, owner_id, opted_out, created_at";

fn row_to_contact(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        display_name: row.get(2)?,
        owner_id: row.get(3)?,
        opted_out: row.get::<_, i64>(4)? != 0,
        created_at: row.get(5)?,
    })
}

/// Look up the contact for `phone_number` under `owner_id`, creating it
/// (with no display name) if absent. `phone_number` must already be in
/// canonical form.
pub async fn find_or_create(
    db: &Database,
    owner_id: &str,
    phone_number: &str,
) -> Result<Contact, HooklineError> {
    let owner = owner_id.to_string();
    let phone = phone_number.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, phone_number, owner_id)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (owner_id, phone_number) DO NOTHING",
                params![new_id, phone, owner],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM contacts
                     WHERE owner_id = ?1 AND phone_number = ?2"
                ),
                params![owner, phone],
                row_to_contact,
            )
            .map_err(Into::into)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a contact by owner and phone number.
pub async fn find_by_phone(
    db: &Database,
    owner_id: &str,
    phone_number: &str,
) -> Result<Option<Contact>, HooklineError> {
    let owner = owner_id.to_string();
    let phone = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM contacts
                 WHERE owner_id = ?1 AND phone_number = ?2"
            ))?;
            let mut rows = stmt.query_map(params![owner, phone], row_to_contact)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of contacts for an owner.
pub async fn count_for_owner(db: &Database, owner_id: &str) -> Result<i64, HooklineError> {
    let owner = owner_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM contacts WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
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

    #[tokio::test]
    async fn creates_contact_on_first_sight() {
        let (db, _dir) = setup_db().await;

        let contact = find_or_create(&db, "system", "+15551234567").await.unwrap();
        assert_eq!(contact.phone_number, "+15551234567");
        assert_eq!(contact.owner_id, "system");
        assert!(contact.display_name.is_none());
        assert!(!contact.opted_out);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_call_returns_same_contact() {
        let (db, _dir) = setup_db().await;

        let first = find_or_create(&db, "system", "+15551234567").await.unwrap();
        let second = find_or_create(&db, "system", "+15551234567").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(count_for_owner(&db, "system").await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_number_different_owner_is_distinct() {
        let (db, _dir) = setup_db().await;

        let a = find_or_create(&db, "system", "+15551234567").await.unwrap();
        let b = find_or_create(&db, "acct_42", "+15551234567").await.unwrap();
        assert_ne!(a.id, b.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_duplicate_deliveries_create_one_contact() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                find_or_create(&db, "system", "+15559990000").await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            let contact = handle.await.unwrap().unwrap();
            ids.push(contact.id);
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1, "all callers must see the same contact row");
        assert_eq!(count_for_owner(&db, "system").await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_by_phone_misses_cleanly() {
        let (db, _dir) = setup_db().await;
        let found = find_by_phone(&db, "system", "+15550000000").await.unwrap();
        assert!(found.is_none());
        db.close().await.unwrap();
    }
}
