// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Greedy message splitting with boundary preference.
//!
//! Chunks are cut at the last paragraph break, newline, or space inside a
//! search window before the platform limit (in that preference order), or
//! hard-split at the limit when no boundary exists. Plain text reassembles
//! exactly; fenced code blocks are closed and reopened across chunk
//! boundaries so the platform renders continuous code.

/// How a split run should treat fenced code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FenceMode {
    /// Leave fences alone (Slack)
    Ignore,
    /// Close an open fence at the chunk end and reopen it with the same
    /// language tag on the next chunk (Discord)
    Preserve,
}

/// Room reserved per chunk for fence close/reopen markers.
const FENCE_MARGIN: usize = 32;

/// Longest language tag carried across a fence reopen.
const MAX_LANG_TAG: usize = 24;

pub(crate) fn split_with(
    text: &str,
    limit: usize,
    window: usize,
    fence_mode: FenceMode,
) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let needs_fence_repair = fence_mode == FenceMode::Preserve && text.contains("```");
    let raw_limit = if needs_fence_repair {
        limit.saturating_sub(FENCE_MARGIN).max(1)
    } else {
        limit
    };

    let raw = split_raw(text, raw_limit, window.min(raw_limit));
    if needs_fence_repair {
        repair_fences(raw)
    } else {
        raw
    }
}

/// Greedy boundary-preferring split. Chunks concatenate back to `text`.
fn split_raw(text: &str, limit: usize, window: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > limit {
        let hard_end = byte_index_of_char(remaining, limit);
        let window_start = byte_index_of_char(remaining, limit.saturating_sub(window));
        let search = &remaining[window_start..hard_end];

        // Last occurrence per preference class; first class with any
        // candidate wins.
        let split_at = find_boundary(search, "\n\n")
            .or_else(|| find_boundary(search, "\n"))
            .or_else(|| find_boundary(search, " "))
            .map(|offset| window_start + offset)
            .unwrap_or(hard_end);

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest;
    }

    chunks.push(remaining.to_string());
    chunks
}

/// Byte offset just past the last occurrence of `boundary`, if any.
fn find_boundary(search: &str, boundary: &str) -> Option<usize> {
    search.rfind(boundary).map(|pos| pos + boundary.len())
}

/// Byte index of the `n`-th character (or the end of the string).
fn byte_index_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Close fences left open at chunk ends and reopen them on the next chunk.
fn repair_fences(chunks: Vec<String>) -> Vec<String> {
    let mut repaired = Vec::with_capacity(chunks.len());
    let mut open_lang: Option<String> = None;

    for chunk in chunks {
        let mut piece = String::new();
        if let Some(lang) = &open_lang {
            piece.push_str("```");
            piece.push_str(lang);
            piece.push('\n');
        }
        piece.push_str(&chunk);

        open_lang = scan_fences(&chunk, open_lang.take());
        if open_lang.is_some() {
            if !piece.ends_with('\n') {
                piece.push('\n');
            }
            piece.push_str("```");
        }
        repaired.push(piece);
    }

    repaired
}

/// Walk a chunk's fences, returning the open fence's language tag (if any)
/// at the end of the chunk.
fn scan_fences(chunk: &str, mut open: Option<String>) -> Option<String> {
    let mut rest = chunk;
    while let Some(pos) = rest.find("```") {
        let after = &rest[pos + 3..];
        match open {
            Some(_) => open = None,
            None => {
                let lang: String = after
                    .chars()
                    .take_while(|c| !c.is_whitespace())
                    .take(MAX_LANG_TAG)
                    .collect();
                open = Some(lang);
            }
        }
        rest = after;
    }
    open
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod tests;
