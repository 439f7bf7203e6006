// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embed builders for tool invocations and stream summaries.

use crate::extract::{get_tool_input_summary, truncate_chars, ToolResult, ToolUse};
use drover_adapters::{Embed, EmbedField};
use drover_core::SdkMessage;

/// Blurple, used for successful tool runs and summaries.
pub const COLOR_SUCCESS: u32 = 0x5865F2;
/// Red, used for errors.
pub const COLOR_ERROR: u32 = 0xEF4444;

/// Discord caps embed field values at 1024 characters.
const FIELD_VALUE_CAP: usize = 1024;

/// Overhead of wrapping a field value in a code block.
const CODE_BLOCK_OVERHEAD: usize = 8; // "```\n" + "\n```"

/// Render a byte/char count with a `k` suffix above 1000.
fn format_output_len(len: usize) -> String {
    if len > 1000 {
        format!("{:.1}k chars", len as f64 / 1000.0)
    } else {
        format!("{len} chars")
    }
}

/// Embed for one tool invocation, optionally paired with its result.
pub fn build_tool_embed(
    tool: &ToolUse,
    result: Option<&ToolResult>,
    duration_ms: Option<u64>,
    max_output_chars: usize,
) -> Embed {
    let is_error = result.is_some_and(|r| r.is_error);
    let mut fields = Vec::new();

    if let Some(duration_ms) = duration_ms {
        fields.push(EmbedField {
            name: "Duration".to_string(),
            value: format_duration_ms(duration_ms),
            inline: true,
        });
    }

    if let Some(result) = result {
        fields.push(EmbedField {
            name: "Output".to_string(),
            value: format_output_len(result.content.chars().count()),
            inline: true,
        });

        let cap = max_output_chars.min(FIELD_VALUE_CAP - CODE_BLOCK_OVERHEAD);
        let body = truncate_chars(&result.content, cap);
        fields.push(EmbedField {
            name: if is_error { "Error" } else { "Result" }.to_string(),
            value: format!("```\n{body}\n```"),
            inline: false,
        });
    }

    Embed {
        title: tool.name.clone(),
        description: Some(get_tool_input_summary(&tool.name, &tool.input))
            .filter(|s| !s.is_empty()),
        color: if is_error { COLOR_ERROR } else { COLOR_SUCCESS },
        fields,
    }
}

/// Embed for a system status message.
pub fn build_status_embed(message: &SdkMessage) -> Embed {
    let subtype = message.subtype().unwrap_or("status");
    Embed {
        title: format!("System: {subtype}"),
        description: None,
        color: COLOR_SUCCESS,
        fields: Vec::new(),
    }
}

/// Embed for the final result summary.
pub fn build_result_embed(message: &SdkMessage) -> Embed {
    let subtype = message.subtype().unwrap_or("done");
    let failed = subtype.contains("error") || subtype.contains("failure");
    Embed {
        title: format!("Result: {subtype}"),
        description: None,
        color: if failed { COLOR_ERROR } else { COLOR_SUCCESS },
        fields: Vec::new(),
    }
}

/// Embed for a stream error.
pub fn build_error_embed(text: &str) -> Embed {
    Embed {
        title: "Error".to_string(),
        description: Some(truncate_chars(text, FIELD_VALUE_CAP)),
        color: COLOR_ERROR,
        fields: Vec::new(),
    }
}

/// Compact duration rendering: "420ms", "2.5s", then the elapsed style.
fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        drover_core::format_elapsed_ms(ms)
    }
}

#[cfg(test)]
#[path = "embed_tests.rs"]
mod tests;
