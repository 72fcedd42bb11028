//! Normalization of free-form request dates into ordering coordinates.
//!
//! Accepted inputs, tried in order:
//!
//! 1. `2020-10-31T10:00:00.000Z`, `...000+0100` or `...000MST` (millisecond
//!    precision with an offset, `Z`, or a common zone abbreviation),
//! 2. RFC 3339 / ISO-8601 zoned date-times, optionally followed by a
//!    bracketed region such as `[Europe/Paris]`; seconds may be omitted
//!    (`2020-10-31T10:00Z`, `2020-10-31T10:00+01:00`),
//! 3. ISO local date-times (`2020-10-31T10:00:00` or `2020-10-31T10:00`),
//!    assumed UTC,
//! 4. ISO local dates (`2020-10-31`), UTC midnight.
//!
//! A missing date means "now".

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::OrderKey;

/// Date text that matched none of the accepted formats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized date `{0}`: expected an ISO-8601 date or date-time")]
pub struct TimestampError(pub String);

const MILLIS_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3f";
const MINUTES_PATTERN: &str = "%Y-%m-%dT%H:%M";

/// Zone abbreviations accepted after a millisecond timestamp, with their
/// offset from UTC in hours.
const ZONE_ABBREVIATIONS: [(&str, i32); 11] = [
    ("Z", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

/// Converts optional date text into a UTC instant.
///
/// # Errors
///
/// Returns [`TimestampError`] if `text` is present but matches none of the
/// accepted formats.
pub fn normalize_date(text: Option<&str>) -> Result<DateTime<Utc>, TimestampError> {
    let Some(raw) = text else {
        return Ok(Utc::now());
    };
    let text = raw.trim();

    if let Some(instant) = parse_millis_zoned(text) {
        return Ok(instant);
    }
    tracing::debug!(date = text, pattern = "yyyy-MM-ddTHH:mm:ss.SSSz", "date did not match");

    if let Some(instant) = parse_iso_zoned(text) {
        return Ok(instant);
    }
    tracing::debug!(date = text, pattern = "iso-zoned", "date did not match");

    if let Some(local) = text
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, MINUTES_PATTERN).ok())
    {
        return Ok(Utc.from_utc_datetime(&local));
    }
    tracing::debug!(date = text, pattern = "iso-local-date-time", "date did not match");

    if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    tracing::debug!(date = text, pattern = "iso-local-date", "date did not match");

    Err(TimestampError(raw.to_string()))
}

/// Builds the [`OrderKey`] for a new event dated by `text`.
///
/// # Errors
///
/// Returns [`TimestampError`] if the date cannot be normalized.
pub fn order_key_for(text: Option<&str>) -> Result<OrderKey, TimestampError> {
    normalize_date(text).map(OrderKey::from_instant)
}

fn parse_millis_zoned(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(zoned) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.3f%z") {
        return Some(zoned.with_timezone(&Utc));
    }

    let split = text.trim_end_matches(|c: char| c.is_ascii_alphabetic()).len();
    let (local, zone) = text.split_at(split);
    let hours = ZONE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(zone))
        .map(|(_, hours)| *hours)?;
    let offset = FixedOffset::east_opt(hours * 3600)?;
    let local = NaiveDateTime::parse_from_str(local, MILLIS_PATTERN).ok()?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|zoned| zoned.with_timezone(&Utc))
}

fn parse_iso_zoned(text: &str) -> Option<DateTime<Utc>> {
    let without_region = match text.find('[') {
        Some(start) if text.ends_with(']') => text.get(..start)?,
        _ => text,
    };
    if let Ok(zoned) = DateTime::parse_from_rfc3339(without_region) {
        return Some(zoned.with_timezone(&Utc));
    }

    // Minute precision, which RFC 3339 does not allow.
    if let Some(local) = without_region
        .strip_suffix('Z')
        .or_else(|| without_region.strip_suffix('z'))
    {
        return NaiveDateTime::parse_from_str(local, MINUTES_PATTERN)
            .ok()
            .map(|local| Utc.from_utc_datetime(&local));
    }
    DateTime::parse_from_str(without_region, "%Y-%m-%dT%H:%M%:z")
        .ok()
        .map(|zoned| zoned.with_timezone(&Utc))
}
