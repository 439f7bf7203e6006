// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Envelope for dynamically-typed SDK messages.
//!
//! The LLM stream yields loosely-shaped JSON objects. The envelope keeps the
//! raw value (so JSONL output logs round-trip byte-for-byte) and derives a
//! tag from the `type` field for dispatch. Accessors never panic on
//! malformed shapes; they return `None` instead.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Known SDK message type tags, plus a generic arm for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Assistant,
    User,
    System,
    Result,
    Error,
    Other,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Assistant => write!(f, "assistant"),
            MessageKind::User => write!(f, "user"),
            MessageKind::System => write!(f, "system"),
            MessageKind::Result => write!(f, "result"),
            MessageKind::Error => write!(f, "error"),
            MessageKind::Other => write!(f, "other"),
        }
    }
}

/// One message from the LLM stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SdkMessage {
    kind: MessageKind,
    payload: Value,
}

impl SdkMessage {
    /// Wrap a raw JSON value, deriving the kind from its `type` field.
    pub fn from_value(payload: Value) -> Self {
        let kind = match payload.get("type").and_then(Value::as_str) {
            Some("assistant") => MessageKind::Assistant,
            Some("user") => MessageKind::User,
            Some("system") => MessageKind::System,
            Some("result") => MessageKind::Result,
            Some("error") => MessageKind::Error,
            _ => MessageKind::Other,
        };
        Self { kind, payload }
    }

    /// Parse a single JSONL line.
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        Ok(Self::from_value(value))
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Session id carried on the message, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.payload.get("session_id").and_then(Value::as_str)
    }

    /// The `subtype` field, if any (e.g. result summaries carry one).
    pub fn subtype(&self) -> Option<&str> {
        self.payload.get("subtype").and_then(Value::as_str)
    }

    /// Human-readable error text for `error` messages.
    ///
    /// Falls back through `error`, `message`, then the whole payload.
    pub fn error_text(&self) -> Option<String> {
        if self.kind != MessageKind::Error {
            return None;
        }
        let text = self
            .payload
            .get("error")
            .and_then(Value::as_str)
            .or_else(|| self.payload.get("message").and_then(Value::as_str));
        match text {
            Some(t) => Some(t.to_string()),
            None => Some(self.payload.to_string()),
        }
    }

    /// Build an assistant message carrying one text block.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::from_value(json!({
            "type": "assistant",
            "message": { "content": [ { "type": "text", "text": text.into() } ] },
        }))
    }

    /// Build a result summary message.
    pub fn result(subtype: impl Into<String>) -> Self {
        Self::from_value(json!({ "type": "result", "subtype": subtype.into() }))
    }

    /// Build an error message.
    pub fn error(text: impl Into<String>) -> Self {
        Self::from_value(json!({ "type": "error", "error": text.into() }))
    }
}

impl Serialize for SdkMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SdkMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
