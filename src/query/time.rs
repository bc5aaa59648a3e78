//! Relative time expression resolution
//!
//! Converts `now` / `now-N<unit>` tokens into absolute epoch milliseconds.
//! Supported units: `s`, `m`, `h`, `d` (days expand to N x 24 hours).
//! Absolute timestamps never reach this module; the where-clause compiler
//! handles those before delegating here.

use crate::query::error::{QueryError, QueryResult};
use chrono::{Duration, Utc};
use regex::Regex;

/// Prefix marking a relative time token
pub const NOW_PREFIX: &str = "now";

/// Resolve a relative time token to absolute epoch milliseconds.
///
/// `"now"` resolves to the current instant; `"now-N<unit>"` resolves to
/// the current instant shifted backward by the parsed duration. Anything
/// else fails with [`QueryError::InvalidTimeFormat`].
pub fn resolve_time_token(token: &str) -> QueryResult<i64> {
    let offset = parse_offset(token)?;
    let instant = Utc::now()
        .checked_sub_signed(offset)
        .ok_or_else(|| QueryError::InvalidTimeFormat(token.to_string()))?;
    Ok(instant.timestamp_millis())
}

/// Parse the backward offset carried by a token; `"now"` alone is zero.
fn parse_offset(token: &str) -> QueryResult<Duration> {
    if token == NOW_PREFIX {
        return Ok(Duration::zero());
    }
    let pattern = Regex::new(r"^now-(\d+)([smhd])$")
        .map_err(|_| QueryError::InvalidTimeFormat(token.to_string()))?;
    let caps = pattern
        .captures(token)
        .ok_or_else(|| QueryError::InvalidTimeFormat(token.to_string()))?;
    let n: i64 = caps[1]
        .parse()
        .map_err(|_| QueryError::InvalidTimeFormat(token.to_string()))?;
    // Offsets beyond what a duration can hold are rejected, not clamped
    let dur = match &caps[2] {
        "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        // Days are expressed as N x 24 hours
        "d" => n.checked_mul(24).and_then(Duration::try_hours),
        _ => None,
    };
    dur.ok_or_else(|| QueryError::InvalidTimeFormat(token.to_string()))
}
