// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signature verification for inbound provider webhooks.
//!
//! Pure functions, no I/O: HMAC-SHA256 over the exact raw request bytes,
//! constant-time comparison, and a best-effort payload timestamp extractor
//! for replay protection. The gateway calls [`verify_signature`]
//! synchronously before anything enters the async pipeline.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm prefixes stripped (case-insensitively) from signature headers.
const ALGORITHM_PREFIXES: [&str; 2] = ["sha256=", "hmac-sha256="];

/// Payload fields consulted, in order, when extracting a timestamp.
const TIMESTAMP_FIELDS: [&str; 4] = ["timestamp", "createdAt", "created_at", "ts"];

/// Verify an inbound webhook payload.
///
/// Computes HMAC-SHA256 over `raw_body` (the exact bytes as received, never a
/// re-serialized form) with `secret`, and compares against the hex signature
/// in `signature_header` in constant time. When `extracted_timestamp` is
/// present, the payload must also be fresh within `tolerance_secs` in either
/// direction; an absent timestamp is accepted to tolerate provider payload
/// variability.
///
/// Returns `false` (never errors) for an empty body, signature, or secret.
pub fn verify_signature(
    raw_body: &[u8],
    signature_header: &str,
    secret: &str,
    extracted_timestamp: Option<i64>,
    tolerance_secs: i64,
) -> bool {
    if raw_body.is_empty() || signature_header.is_empty() || secret.is_empty() {
        return false;
    }

    if let Some(ts) = extracted_timestamp
        && !is_timestamp_fresh(ts, Utc::now().timestamp(), tolerance_secs)
    {
        return false;
    }

    let normalized = strip_algorithm_prefix(signature_header.trim());
    let Ok(provided) = hex::decode(normalized) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    // verify_slice is constant-time; never compare digests byte-by-byte.
    mac.verify_slice(&provided).is_ok()
}

/// Compute the hex-encoded HMAC-SHA256 signature for a payload.
///
/// Counterpart of [`verify_signature`]; used by tests and local tooling to
/// produce signatures the way the provider does.
pub fn compute_signature(raw_body: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

/// Check whether a payload timestamp is within `tolerance_secs` of `now_secs`,
/// in either direction (providers and receivers both have clock skew).
pub fn is_timestamp_fresh(timestamp_secs: i64, now_secs: i64, tolerance_secs: i64) -> bool {
    (now_secs - timestamp_secs).abs() <= tolerance_secs
}

/// Best-effort timestamp extraction from a parsed webhook payload.
///
/// Checks several known field names at the top level and under `data`,
/// accepting Unix epoch integers and ISO-8601 strings. Returns `None` when
/// no recognizable timestamp is present — that is not an error.
pub fn extract_timestamp(payload: &serde_json::Value) -> Option<i64> {
    for location in [Some(payload), payload.get("data")].into_iter().flatten() {
        for field in TIMESTAMP_FIELDS {
            if let Some(value) = location.get(field)
                && let Some(ts) = parse_timestamp_value(value)
            {
                return Some(ts);
            }
        }
    }
    None
}

fn parse_timestamp_value(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.parse::<i64>() {
            return Some(n);
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(dt.timestamp());
        }
    }
    None
}

fn strip_algorithm_prefix(header: &str) -> &str {
    for prefix in ALGORITHM_PREFIXES {
        if header.len() >= prefix.len() && header[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return &header[prefix.len()..];
        }
    }
    header
}
