//! Date conversion between the display format (`DD.MM.YYYY`) used by imported
//! records and the sortable storage format (`YYYY-MM-DD`).
//!
//! All functions are total: malformed or impossible dates yield `None` (or an
//! empty string for the string conversions) so callers can treat them as
//! absent.

use chrono::{Datelike, NaiveDate};

use crate::error::{KpError, KpResult};

/// Parse `DD.MM.YYYY` (day and month may omit the leading zero).
pub fn parse_display_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let mut parts = value.split('.');
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() || year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(
        parse_digits(year)?,
        parse_digits(month)? as u32,
        parse_digits(day)? as u32,
    )
}

/// Parse strict, zero-padded `YYYY-MM-DD`.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !is_iso_date_string(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Shape check for `YYYY-MM-DD` (does not check the calendar).
pub fn is_iso_date_string(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

/// `DD.MM.YYYY` -> `YYYY-MM-DD`, empty string if malformed.
pub fn display_to_iso(value: &str) -> String {
    parse_display_date(value).map(format_iso).unwrap_or_default()
}

/// `YYYY-MM-DD` -> `DD.MM.YYYY`, empty string if malformed.
pub fn iso_to_display(value: &str) -> String {
    parse_iso_date(value).map(format_display).unwrap_or_default()
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_display(date: NaiveDate) -> String {
    format!("{:02}.{:02}.{:04}", date.day(), date.month(), date.year())
}

/// The first day on which an inclusive end date no longer applies.
pub fn day_after(date: NaiveDate) -> Option<NaiveDate> {
    date.succ_opt()
}

/// Parse an optional display-format field, treating `None`, blanks and
/// malformed values alike.
pub fn opt_display_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(parse_display_date)
}

/// Parse an optional ISO-format field.
pub fn opt_iso_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(parse_iso_date)
}

/// Parse a user-supplied date in either format. Unlike the record helpers
/// this reports malformed input.
pub fn parse_user_date(what: &'static str, value: &str) -> KpResult<NaiveDate> {
    parse_iso_date(value)
        .or_else(|| parse_display_date(value))
        .ok_or_else(|| KpError::InvalidDate {
            what,
            value: value.to_string(),
        })
}

fn parse_digits(part: &str) -> Option<i32> {
    if part.is_empty() || part.len() > 4 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
