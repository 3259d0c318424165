//! Normalizer for the heterogeneous date tokens found in ONS timeseries exports.
//!
//! ONS CSV downloads mix monthly ("1988 JAN"), quarterly ("1988 Q1") and
//! annualized/ISO-style tokens in the same column. Everything is canonicalized
//! to a [`NaiveDate`] so series can be joined on date.

use chrono::NaiveDate;
use std::fmt;

/// Why a date token could not be normalized.
///
/// Carried per-record into [`crate::series::CleanReport`] rather than aborting
/// the batch; a bad token drops its row and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    /// The token was empty or whitespace-only.
    Empty,
    /// No recognized month/quarter abbreviation and no parseable calendar form.
    Unrecognized(String),
}

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty date token"),
            Self::Unrecognized(tok) => write!(f, "unrecognized date token: {tok:?}"),
        }
    }
}

impl std::error::Error for DateParseError {}

/// Month/quarter abbreviations used by ONS timeseries exports. Quarter codes
/// map to the final month of the quarter, matching how ONS anchors quarterly
/// observations.
static MONTH_MAP: &[(&str, u32)] = &[
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
    ("Q1", 3),
    ("Q2", 6),
    ("Q3", 9),
    ("Q4", 12),
];

fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    MONTH_MAP
        .iter()
        .find(|(name, _)| *name == abbrev)
        .map(|(_, m)| *m)
}

/// Normalizes an ONS date token to a calendar date.
///
/// Two-token `"<year> <MON>"` inputs are tried first against the fixed
/// month/quarter table (case-insensitive) and resolve to the first day of the
/// mapped month. Anything else falls back to [`parse_calendar`], which keeps
/// the day-of-month present in the source. That asymmetry is intentional:
/// monthly/quarterly observations have no meaningful day, while explicit
/// calendar dates do.
///
/// # Errors
///
/// Returns [`DateParseError`] when no pattern matches. Callers drop the row
/// and record the reason; the batch continues.
pub fn parse_ons_date(token: &str) -> Result<NaiveDate, DateParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DateParseError::Empty);
    }

    let parts: Vec<&str> = token.split_whitespace().collect();
    if parts.len() == 2 {
        if let Ok(year) = parts[0].parse::<i32>() {
            let abbrev = parts[1].to_uppercase();
            if let Some(month) = month_from_abbrev(&abbrev) {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                    return Ok(date);
                }
            }
        }
    }

    parse_calendar(token).ok_or_else(|| DateParseError::Unrecognized(token.to_string()))
}

/// Fallback parser for calendar-form tokens. Day-of-month is preserved where
/// the format carries one; `YYYY-MM` anchors to the first of the month, and a
/// bare four-digit year (the annual observations ONS mixes into the same
/// column) anchors to January 1st.
fn parse_calendar(token: &str) -> Option<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(token, fmt) {
            return Some(date);
        }
    }

    // "2024-03" style, no day component
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{token}-01"), "%Y-%m-%d") {
        return Some(date);
    }

    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(year) = token.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }

    None
}
