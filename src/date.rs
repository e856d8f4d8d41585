//! Timestamp helpers: parse the spellings status records use, render as RFC 3339.

use anyhow::{Context, Result};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

/// Parse a textual timestamp. Accepts RFC 3339 and the classic status format
/// `Wed Aug 27 13:08:45 +0000 2008`.
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(t);
    }
    let classic = format_description!(
        "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute] [year]"
    );
    OffsetDateTime::parse(s, classic).ok()
}

/// Unix seconds (integral or fractional) to a UTC timestamp.
pub fn from_epoch_seconds(secs: f64) -> Option<OffsetDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let nanos = (secs * 1_000_000_000.0).round() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
}

pub fn format_timestamp(ts: OffsetDateTime) -> Result<String> {
    ts.format(&Rfc3339).with_context(|| format!("format timestamp {:?}", ts))
}

/// Fractional days to a `Duration` (e.g. `2.5` -> 60 hours). `d` must be finite and in range;
/// `RunConfig` checks this against `MAX_WINDOW_DAYS`.
pub fn days(d: f64) -> Duration {
    Duration::seconds_f64(d * 86_400.0)
}

pub fn hours(h: u32) -> Duration {
    Duration::hours(h as i64)
}
