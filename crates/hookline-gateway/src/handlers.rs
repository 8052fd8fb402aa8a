// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion handlers.
//!
//! The post handler is the trust boundary: it validates transport, parses,
//! and verifies the HMAC signature synchronously, then persists the raw
//! payload and enqueues it. No business processing happens inline; the
//! caller gets its acknowledgment before any reconciliation runs.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use hookline_queue::WEBHOOK_QUEUE;
use hookline_storage::queries;
use hookline_verify::{extract_timestamp, verify_signature};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::server::GatewayState;

/// Provider signature header.
pub const SIGNATURE_HEADER: &str = "openphone-signature";

/// Body for an accepted delivery.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

/// Body for a rejected delivery.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body for GET /webhooks/openphone/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub signing_secret_configured: bool,
}

fn reject(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

fn caller_origin(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    // Parameters (charset etc.) are allowed after the media type.
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .eq_ignore_ascii_case("application/json")
}

/// POST /webhooks/openphone
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_json_content_type(&headers) {
        return reject(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "content-type must be application/json",
        );
    }

    let Ok(raw_body) = std::str::from_utf8(&body) else {
        return reject(StatusCode::BAD_REQUEST, "request body must be valid UTF-8");
    };

    let payload: serde_json::Value = match serde_json::from_str(raw_body) {
        Ok(value) => value,
        Err(e) => {
            return reject(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("malformed JSON body: {e}"),
            );
        }
    };

    if !payload.get("data").is_some_and(serde_json::Value::is_object) {
        return reject(StatusCode::BAD_REQUEST, "payload must carry a data object");
    }

    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    // Fail-closed: with no secret configured nothing is accepted.
    let authorized = match (state.signing_secret.as_deref(), signature) {
        (Some(secret), Some(sig)) => {
            let timestamp = extract_timestamp(&payload);
            verify_signature(&body, sig, secret, timestamp, state.timestamp_tolerance_secs)
        }
        _ => false,
    };
    if !authorized {
        warn!(
            origin = caller_origin(&headers),
            secret_configured = state.signing_secret.is_some(),
            "webhook rejected: missing or invalid signature"
        );
        return reject(StatusCode::BAD_REQUEST, "missing or invalid signature");
    }

    let event_type = payload
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown");

    if let Err(e) = queries::raw_events::insert(&state.db, event_type, raw_body).await {
        error!(error = %e, "failed to persist raw event");
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "failed to accept event");
    }

    match queries::queue::enqueue(&state.db, WEBHOOK_QUEUE, raw_body, state.max_attempts).await {
        Ok(task_id) => {
            debug!(task_id, event_type, "webhook accepted and enqueued");
            (StatusCode::OK, Json(AckResponse { status: "queued" })).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to enqueue webhook task");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "failed to enqueue event")
        }
    }
}

/// GET /webhooks/openphone/health
///
/// Reports whether a signing secret is configured without ever revealing it.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            signing_secret_configured: state.signing_secret.is_some(),
        }),
    )
        .into_response()
}
