// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation handlers: map one parsed event to create/update operations
//! on contacts and messages.
//!
//! Handlers return terminal [`Outcome`]s for anything that will never succeed
//! on retry (missing fields, duplicates, out-of-order status updates) and
//! propagate storage errors as `Err` so the retry worker can reschedule.

use hookline_core::{Direction, HooklineError, MessageKind, Outcome, normalize_phone};
use hookline_storage::models::NewMessage;
use hookline_storage::{Contact, Database, queries};

use crate::event::ParsedEvent;

/// Execution-context-independent reconciler settings.
///
/// The same handlers run from the worker pool and from tests; everything
/// context-specific is injected here.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// Owner account for contacts created from webhook traffic.
    pub system_owner: String,
}

impl ReconcileContext {
    pub fn new(system_owner: impl Into<String>) -> Self {
        Self {
            system_owner: system_owner.into(),
        }
    }
}

/// Normalize and look up (or create) the contact for a raw phone number.
///
/// Returns `None` when the number cannot be normalized; the caller decides
/// whether that is fatal for its event.
pub async fn find_or_create_contact(
    db: &Database,
    ctx: &ReconcileContext,
    raw_phone: &str,
) -> Result<Option<Contact>, HooklineError> {
    let Some(phone) = normalize_phone(raw_phone) else {
        return Ok(None);
    };
    let contact = queries::contacts::find_or_create(db, &ctx.system_owner, &phone).await?;
    Ok(Some(contact))
}

fn normalize_opt(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_phone)
}

fn format_duration(secs: i64) -> String {
    if secs < 60 {
        return format!("{secs}s");
    }
    format!("{}m {}s", secs / 60, secs % 60)
}

/// Human-readable body for call and voicemail rows, composed from whatever
/// descriptive fields the event carried.
fn compose_body(
    label: &str,
    duration_secs: Option<i64>,
    transcript: Option<&str>,
    recording_url: Option<&str>,
) -> String {
    let mut body = label.to_string();
    if let Some(secs) = duration_secs {
        body.push_str(&format!(" ({})", format_duration(secs)));
    }
    if let Some(text) = transcript {
        body.push_str(&format!(": {text}"));
    }
    if let Some(url) = recording_url {
        body.push_str(&format!(" [recording: {url}]"));
    }
    body
}

fn insert_outcome(created: bool) -> Outcome {
    if created {
        Outcome::Processed
    } else {
        Outcome::Duplicate
    }
}

fn update_outcome(found: bool) -> Outcome {
    if found {
        Outcome::Processed
    } else {
        Outcome::NotFound
    }
}

/// Inbound SMS. Requires the provider message id and the sender's number.
pub async fn message_received(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    let Some(external_id) = event.str_field("id") else {
        return Ok(Outcome::InvalidData("missing message id".to_string()));
    };
    let Some(from) = event.str_field("from") else {
        return Ok(Outcome::InvalidData("missing sender number".to_string()));
    };
    let Some(contact) = find_or_create_contact(db, ctx, from).await? else {
        return Ok(Outcome::InvalidData(format!(
            "unparseable sender number: {from}"
        )));
    };

    let created = queries::messages::insert_if_absent(
        db,
        NewMessage {
            external_id: external_id.to_string(),
            contact_id: contact.id,
            direction: Direction::Inbound.to_string(),
            kind: MessageKind::Sms.to_string(),
            status: "received".to_string(),
            body: event
                .first_str_field(&["body", "text"])
                .map(str::to_string),
            from_number: Some(contact.phone_number),
            to_number: normalize_opt(event.str_field("to")),
            received_at: event
                .first_str_field(&["receivedAt", "createdAt"])
                .map(str::to_string),
            ..Default::default()
        },
    )
    .await?;
    Ok(insert_outcome(created))
}

/// Outbound SMS accepted by the provider. The contact is the recipient.
pub async fn message_sent(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    let Some(external_id) = event.str_field("id") else {
        return Ok(Outcome::InvalidData("missing message id".to_string()));
    };
    let Some(to) = event.str_field("to") else {
        return Ok(Outcome::InvalidData("missing recipient number".to_string()));
    };
    let Some(contact) = find_or_create_contact(db, ctx, to).await? else {
        return Ok(Outcome::InvalidData(format!(
            "unparseable recipient number: {to}"
        )));
    };

    let created = queries::messages::insert_if_absent(
        db,
        NewMessage {
            external_id: external_id.to_string(),
            contact_id: contact.id,
            direction: Direction::Outbound.to_string(),
            kind: MessageKind::Sms.to_string(),
            status: "sent".to_string(),
            body: event
                .first_str_field(&["body", "text"])
                .map(str::to_string),
            from_number: normalize_opt(event.str_field("from")),
            to_number: Some(contact.phone_number),
            sent_at: event
                .first_str_field(&["sentAt", "createdAt"])
                .map(str::to_string),
            ..Default::default()
        },
    )
    .await?;
    Ok(insert_outcome(created))
}

/// Delivery confirmation for a previously sent message.
pub async fn message_delivered(
    db: &Database,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    let Some(external_id) = event.str_field("id") else {
        return Ok(Outcome::InvalidData("missing message id".to_string()));
    };
    let delivered_at = event
        .first_str_field(&["deliveredAt", "createdAt"])
        .map(str::to_string);
    let found =
        queries::messages::update_status(db, external_id, "delivered", delivered_at, None).await?;
    if !found {
        tracing::info!(external_id, "delivery update before creation event");
    }
    Ok(update_outcome(found))
}

/// Delivery failure for a previously sent message.
pub async fn message_failed(db: &Database, event: &ParsedEvent) -> Result<Outcome, HooklineError> {
    let Some(external_id) = event.str_field("id") else {
        return Ok(Outcome::InvalidData("missing message id".to_string()));
    };
    let error_detail = event
        .first_str_field(&["error", "reason"])
        .map(str::to_string);
    let found =
        queries::messages::update_status(db, external_id, "failed", None, error_detail).await?;
    if !found {
        tracing::info!(external_id, "failure update before creation event");
    }
    Ok(update_outcome(found))
}

fn call_counterparty<'a>(event: &'a ParsedEvent) -> (Direction, Option<&'a str>) {
    let outbound = matches!(
        event.str_field("direction"),
        Some("outgoing") | Some("outbound")
    );
    if outbound {
        (Direction::Outbound, event.str_field("to"))
    } else {
        (Direction::Inbound, event.str_field("from"))
    }
}

async fn record_call(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
    status: &str,
    label: &str,
) -> Result<Outcome, HooklineError> {
    let Some(external_id) = event.str_field("id") else {
        return Ok(Outcome::InvalidData("missing call id".to_string()));
    };
    let (direction, counterparty) = call_counterparty(event);
    let Some(raw_phone) = counterparty else {
        return Ok(Outcome::InvalidData(
            "missing counterparty number".to_string(),
        ));
    };
    let Some(contact) = find_or_create_contact(db, ctx, raw_phone).await? else {
        return Ok(Outcome::InvalidData(format!(
            "unparseable counterparty number: {raw_phone}"
        )));
    };

    let duration_secs = event.i64_field("duration");
    let body = compose_body(
        label,
        duration_secs,
        event.str_field("transcript"),
        event.first_str_field(&["recordingUrl", "mediaUrl"]),
    );
    let (from_number, to_number) = match direction {
        Direction::Inbound => (
            Some(contact.phone_number.clone()),
            normalize_opt(event.str_field("to")),
        ),
        Direction::Outbound => (
            normalize_opt(event.str_field("from")),
            Some(contact.phone_number.clone()),
        ),
    };

    let created = queries::messages::insert_if_absent(
        db,
        NewMessage {
            external_id: external_id.to_string(),
            contact_id: contact.id,
            direction: direction.to_string(),
            kind: MessageKind::Call.to_string(),
            status: status.to_string(),
            body: Some(body),
            duration_secs,
            from_number,
            to_number,
            received_at: event
                .first_str_field(&["completedAt", "createdAt"])
                .map(str::to_string),
            ..Default::default()
        },
    )
    .await?;
    Ok(insert_outcome(created))
}

/// A call that connected and ended.
pub async fn call_completed(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    record_call(db, ctx, event, "completed", "Call completed").await
}

/// An inbound call nobody answered.
pub async fn call_missed(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    record_call(db, ctx, event, "missed", "Missed call").await
}

/// A voicemail left by the caller. Always inbound.
pub async fn voicemail_received(
    db: &Database,
    ctx: &ReconcileContext,
    event: &ParsedEvent,
) -> Result<Outcome, HooklineError> {
    let Some(external_id) = event.str_field("id") else {
        return Ok(Outcome::InvalidData("missing voicemail id".to_string()));
    };
    let Some(from) = event.str_field("from") else {
        return Ok(Outcome::InvalidData("missing caller number".to_string()));
    };
    let Some(contact) = find_or_create_contact(db, ctx, from).await? else {
        return Ok(Outcome::InvalidData(format!(
            "unparseable caller number: {from}"
        )));
    };

    let duration_secs = event.i64_field("duration");
    let body = compose_body(
        "Voicemail",
        duration_secs,
        event.str_field("transcript"),
        event.first_str_field(&["recordingUrl", "mediaUrl"]),
    );

    let created = queries::messages::insert_if_absent(
        db,
        NewMessage {
            external_id: external_id.to_string(),
            contact_id: contact.id,
            direction: Direction::Inbound.to_string(),
            kind: MessageKind::Voicemail.to_string(),
            status: "received".to_string(),
            body: Some(body),
            duration_secs,
            from_number: Some(contact.phone_number),
            to_number: normalize_opt(event.str_field("to")),
            received_at: event
                .first_str_field(&["receivedAt", "createdAt"])
                .map(str::to_string),
            ..Default::default()
        },
    )
    .await?;
    Ok(insert_outcome(created))
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

    fn event(value: serde_json::Value) -> ParsedEvent {
        ParsedEvent::from_value(value)
    }

    #[tokio::test]
    async fn message_received_creates_contact_and_message() {
        let (db, ctx, _dir) = setup().await;

        let outcome = message_received(
            &db,
            &ctx,
            &event(json!({
                "type": "message.received",
                "data": {
                    "id": "msg_1",
                    "from": "(555) 123-4567",
                    "to": "+15550001111",
                    "body": "hello there",
                    "createdAt": "2026-01-01T00:00:00Z"
                }
            })),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Processed);

        // Contact stored under the canonical phone form.
        let contact = queries::contacts::find_by_phone(&db, "system", "+15551234567")
            .await
            .unwrap()
            .unwrap();
        let msg = queries::messages::find_by_external_id(&db, "msg_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.contact_id, contact.id);
        assert_eq!(msg.direction, "inbound");
        assert_eq!(msg.kind, "sms");
        assert_eq!(msg.status, "received");
        assert_eq!(msg.body.as_deref(), Some("hello there"));
        assert_eq!(msg.received_at.as_deref(), Some("2026-01-01T00:00:00Z"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_delivery_is_reported_not_reinserted() {
        let (db, ctx, _dir) = setup().await;
        let payload = json!({
            "type": "message.received",
            "data": { "id": "msg_1", "from": "+15551234567" }
        });

        assert_eq!(
            message_received(&db, &ctx, &event(payload.clone())).await.unwrap(),
            Outcome::Processed
        );
        assert_eq!(
            message_received(&db, &ctx, &event(payload)).await.unwrap(),
            Outcome::Duplicate
        );
        assert_eq!(queries::messages::count(&db).await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_required_fields_are_invalid_data() {
        let (db, ctx, _dir) = setup().await;

        let no_id = message_received(
            &db,
            &ctx,
            &event(json!({ "type": "message.received", "data": { "from": "+15551234567" } })),
        )
        .await
        .unwrap();
        assert!(matches!(no_id, Outcome::InvalidData(_)));

        let no_from = message_received(
            &db,
            &ctx,
            &event(json!({ "type": "message.received", "data": { "id": "msg_1" } })),
        )
        .await
        .unwrap();
        assert!(matches!(no_from, Outcome::InvalidData(_)));

        let bad_phone = message_received(
            &db,
            &ctx,
            &event(json!({
                "type": "message.received",
                "data": { "id": "msg_1", "from": "anonymous" }
            })),
        )
        .await
        .unwrap();
        assert!(matches!(bad_phone, Outcome::InvalidData(_)));

        // Nothing was persisted along the way.
        assert_eq!(queries::messages::count(&db).await.unwrap(), 0);
        assert_eq!(queries::contacts::count_for_owner(&db, "system").await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn message_sent_attaches_contact_to_recipient() {
        let (db, ctx, _dir) = setup().await;

        let outcome = message_sent(
            &db,
            &ctx,
            &event(json!({
                "type": "message.sent",
                "data": {
                    "id": "msg_out",
                    "from": "+15550001111",
                    "to": "+15559876543",
                    "body": "your appointment is tomorrow",
                    "sentAt": "2026-01-01T09:00:00Z"
                }
            })),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Processed);

        let msg = queries::messages::find_by_external_id(&db, "msg_out")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.direction, "outbound");
        assert_eq!(msg.status, "sent");
        assert_eq!(msg.to_number.as_deref(), Some("+15559876543"));
        assert!(
            queries::contacts::find_by_phone(&db, "system", "+15559876543")
                .await
                .unwrap()
                .is_some()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delivered_update_applies_after_creation() {
        let (db, ctx, _dir) = setup().await;

        message_sent(
            &db,
            &ctx,
            &event(json!({
                "type": "message.sent",
                "data": { "id": "msg_out", "to": "+15559876543" }
            })),
        )
        .await
        .unwrap();

        let outcome = message_delivered(
            &db,
            &event(json!({
                "type": "message.delivered",
                "data": { "id": "msg_out", "deliveredAt": "2026-01-01T09:00:05Z" }
            })),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Processed);

        let msg = queries::messages::find_by_external_id(&db, "msg_out")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.status, "delivered");
        assert_eq!(msg.delivered_at.as_deref(), Some("2026-01-01T09:00:05Z"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delivered_update_before_creation_is_not_found() {
        let (db, _ctx, _dir) = setup().await;

        let outcome = message_delivered(
            &db,
            &event(json!({
                "type": "message.delivered",
                "data": { "id": "msg_never_created" }
            })),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::NotFound);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_update_records_reason() {
        let (db, ctx, _dir) = setup().await;

        message_sent(
            &db,
            &ctx,
            &event(json!({
                "type": "message.sent",
                "data": { "id": "msg_out", "to": "+15559876543" }
            })),
        )
        .await
        .unwrap();

        let outcome = message_failed(
            &db,
            &event(json!({
                "type": "message.failed",
                "data": { "id": "msg_out", "error": "carrier rejected: 30007" }
            })),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Processed);

        let msg = queries::messages::find_by_external_id(&db, "msg_out")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.status, "failed");
        assert_eq!(msg.error_detail.as_deref(), Some("carrier rejected: 30007"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn call_completed_composes_body_from_duration_and_recording() {
        let (db, ctx, _dir) = setup().await;

        let outcome = call_completed(
            &db,
            &ctx,
            &event(json!({
                "type": "call.completed",
                "data": {
                    "id": "call_1",
                    "from": "+15551234567",
                    "to": "+15550001111",
                    "duration": 205,
                    "recordingUrl": "https://example.com/rec/call_1"
                }
            })),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Processed);

        let msg = queries::messages::find_by_external_id(&db, "call_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.kind, "call");
        assert_eq!(msg.status, "completed");
        assert_eq!(msg.direction, "inbound");
        assert_eq!(msg.duration_secs, Some(205));
        assert_eq!(
            msg.body.as_deref(),
            Some("Call completed (3m 25s) [recording: https://example.com/rec/call_1]")
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn outgoing_call_uses_recipient_as_contact() {
        let (db, ctx, _dir) = setup().await;

        call_completed(
            &db,
            &ctx,
            &event(json!({
                "type": "call.completed",
                "data": {
                    "id": "call_out",
                    "direction": "outgoing",
                    "from": "+15550001111",
                    "to": "+15559876543",
                    "duration": 30
                }
            })),
        )
        .await
        .unwrap();

        let msg = queries::messages::find_by_external_id(&db, "call_out")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.direction, "outbound");
        assert!(
            queries::contacts::find_by_phone(&db, "system", "+15559876543")
                .await
                .unwrap()
                .is_some()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn call_missed_records_inbound_miss() {
        let (db, ctx, _dir) = setup().await;

        call_missed(
            &db,
            &ctx,
            &event(json!({
                "type": "call.missed",
                "data": { "id": "call_2", "from": "+15551234567" }
            })),
        )
        .await
        .unwrap();

        let msg = queries::messages::find_by_external_id(&db, "call_2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.status, "missed");
        assert_eq!(msg.body.as_deref(), Some("Missed call"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn voicemail_body_includes_transcript() {
        let (db, ctx, _dir) = setup().await;

        voicemail_received(
            &db,
            &ctx,
            &event(json!({
                "type": "voicemail.received",
                "data": {
                    "id": "vm_1",
                    "from": "+15551234567",
                    "duration": 42,
                    "transcript": "call me back please"
                }
            })),
        )
        .await
        .unwrap();

        let msg = queries::messages::find_by_external_id(&db, "vm_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.kind, "voicemail");
        assert_eq!(
            msg.body.as_deref(),
            Some("Voicemail (42s): call me back please")
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeated_numbers_reuse_one_contact() {
        let (db, ctx, _dir) = setup().await;

        for id in ["msg_1", "msg_2", "vm_1"] {
            let payload = json!({
                "type": "message.received",
                "data": { "id": id, "from": "+1 (555) 123-4567" }
            });
            message_received(&db, &ctx, &event(payload)).await.unwrap();
        }

        assert_eq!(queries::contacts::count_for_owner(&db, "system").await.unwrap(), 1);
        assert_eq!(queries::messages::count(&db).await.unwrap(), 3);

        db.close().await.unwrap();
    }
}
