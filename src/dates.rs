//! Conversions between the provider's compact `DDMMYYYY` date and ISO `YYYY-MM-DD`.
//!
//! The provider addresses its programme by compact date while the private
//! backend takes ISO dates. The lenient string conversions return malformed
//! input unchanged; the `try_` variants reject it and are what request
//! validation uses.

use crate::error::ExecError;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

const COMPACT_FORMAT: &str = "%d%m%Y";
const ISO_FORMAT: &str = "%Y-%m-%d";

/// `YYYY-MM-DD` -> `DDMMYYYY`. Input that is not 10 characters, or not three
/// dash-separated parts, is returned unchanged.
pub fn compact_from_iso(iso: &str) -> String {
    if iso.len() != 10 || !iso.is_ascii() {
        return iso.to_string();
    }
    let parts: Vec<&str> = iso.split('-').collect();
    match parts.as_slice() {
        [year, month, day] => format!("{day}{month}{year}"),
        _ => iso.to_string(),
    }
}

/// `DDMMYYYY` -> `YYYY-MM-DD`. Input that is not 8 characters is returned unchanged.
pub fn iso_from_compact(compact: &str) -> String {
    if compact.len() != 8 || !compact.is_ascii() {
        return compact.to_string();
    }
    let (day, rest) = compact.split_at(2);
    let (month, year) = rest.split_at(2);
    format!("{year}-{month}-{day}")
}

pub fn compact_from_date(date: NaiveDate) -> String {
    date.format(COMPACT_FORMAT).to_string()
}

pub fn iso_from_date(date: NaiveDate) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Parse a compact date into a calendar date. `None` when the string is the
/// wrong length or does not name a real day.
pub fn parse_compact(compact: &str) -> Option<NaiveDate> {
    if compact.len() != 8 || !compact.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(compact, COMPACT_FORMAT).ok()
}

/// Parse a canonical `YYYY-MM-DD` date. Signs, padding spaces and
/// single-digit fields are rejected.
pub fn parse_iso(iso: &str) -> Option<NaiveDate> {
    let canonical = iso.len() == 10
        && iso.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !canonical {
        return None;
    }
    NaiveDate::parse_from_str(iso, ISO_FORMAT).ok()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn today_compact() -> String {
    compact_from_date(today())
}

pub fn today_iso() -> String {
    iso_from_date(today())
}

/// Strict `DDMMYYYY` -> `YYYY-MM-DD`.
pub fn try_iso_from_compact(compact: &str) -> Result<String, ExecError> {
    parse_compact(compact)
        .map(iso_from_date)
        .ok_or_else(|| ExecError::validation(format!("invalid compact date: {compact:?}")))
}

/// Strict `YYYY-MM-DD` -> `DDMMYYYY`.
pub fn try_compact_from_iso(iso: &str) -> Result<String, ExecError> {
    parse_iso(iso)
        .map(compact_from_date)
        .ok_or_else(|| ExecError::validation(format!("invalid ISO date: {iso:?}")))
}

/// `HH:MM` in local time for an RFC 3339 or naive ISO datetime; anything
/// unparsable is returned unchanged.
pub fn format_time_from_iso(datetime: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime) {
        return dt.with_timezone(&Local).format("%H:%M").to_string();
    }
    match NaiveDateTime::parse_from_str(datetime, "%Y-%m-%dT%H:%M:%S") {
        Ok(naive) => naive.format("%H:%M").to_string(),
        Err(_) => datetime.to_string(),
    }
}

/// The provider reports start times (`heureDepart`) as epoch milliseconds.
pub fn format_time_from_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
}
