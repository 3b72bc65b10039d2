//! Frontmatter date handling.
//!
//! Dates are free text in frontmatter. Anything that reads as an ISO date
//! is displayed long-form (`February 1, 2024`) and compared
//! chronologically; anything else is shown verbatim.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

/// Parse an ISO-8601 calendar date, with or without a time part.
///
/// Accepts `2024-02-01`, `2024-02-01T09:30:00` and RFC 3339 timestamps.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

/// Display form of a frontmatter date.
pub fn format_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => raw.trim().to_string(),
    }
}

/// Newest first. Parseable dates sort ahead of unparseable ones, which all
/// compare equal to each other.
pub fn newest_first(a: &str, b: &str) -> Ordering {
    match (parse_date(a), parse_date(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
