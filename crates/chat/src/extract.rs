// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lenient content extraction from SDK messages.
//!
//! Stream payloads come in three shapes: a `content` string on the root, a
//! string at `message.content`, or an array of typed blocks at
//! `message.content`. Every helper returns `None`/empty on absent or
//! malformed input rather than erroring.

use drover_core::SdkMessage;
use serde_json::Value;

/// One `tool_use` block from an assistant message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub id: Option<String>,
    pub name: String,
    pub input: Value,
}

/// One `tool_result` block from a user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_use_id: Option<String>,
    pub content: String,
    pub is_error: bool,
}

fn content_blocks(message: &SdkMessage) -> Option<&Vec<Value>> {
    message
        .payload()
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| message.payload().get("content"))
        .and_then(Value::as_array)
}

/// Extract assistant-visible text.
///
/// Concatenates the text blocks of an array-shaped content, or returns the
/// string-shaped content directly. `None` when nothing non-empty is found.
pub fn extract_message_content(message: &SdkMessage) -> Option<String> {
    let payload = message.payload();

    if let Some(text) = payload.get("content").and_then(Value::as_str) {
        return non_empty(text.to_string());
    }
    if let Some(text) = payload
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
    {
        return non_empty(text.to_string());
    }

    let blocks = content_blocks(message)?;
    let text: String = blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    non_empty(text)
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract `tool_use` blocks (Anthropic-style content shape).
pub fn extract_tool_use_blocks(message: &SdkMessage) -> Vec<ToolUse> {
    let Some(blocks) = content_blocks(message) else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_use"))
        .filter_map(|block| {
            Some(ToolUse {
                id: block
                    .get("id")
                    .and_then(Value::as_str)
                    .map(String::from),
                name: block.get("name").and_then(Value::as_str)?.to_string(),
                input: block.get("input").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

/// Extract `tool_result` blocks.
///
/// Result content may be a plain string or an array of text blocks.
pub fn extract_tool_results(message: &SdkMessage) -> Vec<ToolResult> {
    let Some(blocks) = content_blocks(message) else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_result"))
        .map(|block| ToolResult {
            tool_use_id: block
                .get("tool_use_id")
                .and_then(Value::as_str)
                .map(String::from),
            content: result_content(block.get("content")),
            is_error: block
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
        .collect()
}

fn result_content(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Summary cap for tool inputs.
const INPUT_SUMMARY_MAX: usize = 200;

/// Brief, tool-specific input summary for embeds.
pub fn get_tool_input_summary(name: &str, input: &Value) -> String {
    let key = match name {
        "Bash" => Some("command"),
        "Read" | "Write" | "Edit" => Some("file_path"),
        "Glob" | "Grep" => Some("pattern"),
        "WebSearch" => Some("query"),
        _ => None,
    };

    let summary = key
        .and_then(|k| input.get(k))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| match input {
            Value::Null => String::new(),
            other => other.to_string(),
        });

    truncate_chars(&summary, INPUT_SUMMARY_MAX)
}

/// Truncate to at most `max` characters, ellipsis included.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
