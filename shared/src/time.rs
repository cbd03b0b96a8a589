//! ISO-8601 parsing for meeting times.
//!
//! Meeting times are stored exactly as the client sent them. Filtering and
//! overlap checks only consider values that parse here; anything else is
//! opaque and never matches a time-window predicate.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// Parse an ISO-8601 date-time into a UTC instant.
///
/// Accepts RFC 3339, minute precision (`2024-01-01T09:00Z`), optional
/// fractional seconds, `Z` or a numeric offset, and no offset at all (taken
/// as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = value.strip_suffix(['Z', 'z']) {
        return parse_naive(naive).map(|dt| dt.and_utc());
    }

    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::<FixedOffset>::parse_from_str(value, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_naive(value).map(|dt| dt.and_utc()))
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// A parsed `[start, end]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Parse both ends; `None` if either is unparseable.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self {
            start: parse_timestamp(start)?,
            end: parse_timestamp(end)?,
        })
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// `[a,b]` and `[c,d]` overlap iff `a <= d && c <= b`.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Server timestamp for `created_at`, ISO-8601 UTC.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
