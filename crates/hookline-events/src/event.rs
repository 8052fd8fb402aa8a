// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsed webhook event wrapper.
//!
//! Provider payloads put event fields either directly under `data` or one
//! level deeper under `data.object`, depending on the event family. The
//! accessors here check both locations so handlers stay agnostic.

use hookline_core::EventType;
use serde_json::Value;

/// A webhook payload parsed into JSON, with typed access to the fields the
/// reconciler cares about.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    value: Value,
}

impl ParsedEvent {
    /// Parse a raw body. Fails only on malformed JSON; structural problems
    /// (missing `type`, missing `data`) surface through the accessors.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value = serde_json::from_str(raw)?;
        Ok(Self { value })
    }

    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// The event type, when the document carries a string `type` field.
    pub fn event_type(&self) -> Option<EventType> {
        self.value
            .get("type")
            .and_then(Value::as_str)
            .map(EventType::parse)
    }

    /// Whether the document carries a `data` object.
    pub fn has_data(&self) -> bool {
        self.value.get("data").is_some_and(Value::is_object)
    }

    /// Look up a field under `data`, falling back to `data.object`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let data = self.value.get("data")?;
        data.get(name)
            .or_else(|| data.get("object").and_then(|obj| obj.get(name)))
    }

    /// String field under `data` / `data.object`.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// The first present string field from a list of candidate names.
    pub fn first_str_field(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.str_field(name))
    }

    /// Integer field under `data` / `data.object`.
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(Value::as_i64)
    }

    /// The underlying JSON document.
    pub fn raw(&self) -> &Value {
        &self.value
    }
}
