// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interval string parsing for schedules.

use std::time::Duration;
use thiserror::Error;

/// Errors from interval parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("empty interval string")]
    Empty,
    #[error("invalid number in interval: {0}")]
    InvalidNumber(String),
    #[error("unknown interval suffix: {0}")]
    UnknownSuffix(String),
}

/// Milliseconds per unit, keyed by the accepted suffix spellings.
/// A missing suffix means seconds.
const UNIT_TABLE: &[(u64, &[&str])] = &[
    (1, &["ms", "millis", "millisecond", "milliseconds"]),
    (1_000, &["", "s", "sec", "secs", "second", "seconds"]),
    (60_000, &["m", "min", "mins", "minute", "minutes"]),
    (3_600_000, &["h", "hr", "hrs", "hour", "hours"]),
    (86_400_000, &["d", "day", "days"]),
];

fn millis_per_unit(unit: &str) -> Option<u64> {
    UNIT_TABLE
        .iter()
        .find(|(_, spellings)| spellings.contains(&unit))
        .map(|(millis, _)| *millis)
}

/// Parse an interval string like `"30s"`, `"5m"`, `"1h"`, `"100ms"` into a Duration.
///
/// Sub-second intervals are allowed (used by tests); real fleets use
/// minutes and hours. A bare number is treated as seconds.
pub fn parse_interval(s: &str) -> Result<Duration, IntervalError> {
    let input = s.trim();
    if input.is_empty() {
        return Err(IntervalError::Empty);
    }

    // Everything up to the last digit is the count, the rest is the unit
    let unit_start = input
        .rfind(|c: char| c.is_ascii_digit())
        .map(|i| i + 1)
        .ok_or_else(|| IntervalError::InvalidNumber(input.to_string()))?;
    let (count, unit) = input.split_at(unit_start);

    let count: u64 = count
        .parse()
        .map_err(|_| IntervalError::InvalidNumber(input.to_string()))?;
    let millis = millis_per_unit(unit.trim())
        .ok_or_else(|| IntervalError::UnknownSuffix(unit.trim().to_string()))?;

    Ok(Duration::from_millis(count.saturating_mul(millis)))
}

#[cfg(test)]
#[path = "interval_tests.rs"]
mod tests;
