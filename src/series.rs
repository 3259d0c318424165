//! Cleaning of raw ONS timeseries CSV exports into date-sorted series.
//!
//! ONS generator downloads carry a preamble of metadata rows (title, CDID,
//! release date, ...) before the actual `date,value` table starts. The header
//! position varies between series, so it is detected heuristically with a
//! fixed skip-row ladder as backstop.

use crate::dates::{DateParseError, parse_ons_date};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// A single observation in a cleaned series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A cleaned, date-sorted timeseries.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Inclusive year span of the series, if non-empty.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        use chrono::Datelike;
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.date.year(), last.date.year()))
    }
}

/// Why a raw row was excluded from the cleaned series.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// The date token did not normalize.
    BadDate(DateParseError),
    /// The value column was not numeric.
    BadValue(String),
    /// The row had fewer than two columns.
    ShortRow,
    /// The CSV reader could not decode the record at all.
    Unreadable(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDate(e) => write!(f, "bad date: {e}"),
            Self::BadValue(v) => write!(f, "non-numeric value: {v:?}"),
            Self::ShortRow => write!(f, "row has fewer than two columns"),
            Self::Unreadable(e) => write!(f, "unreadable record: {e}"),
        }
    }
}

/// Outcome summary of cleaning one raw file. Dropped rows are recorded with
/// their zero-based data-row index and reason instead of vanishing silently.
#[derive(Debug, Default)]
pub struct CleanReport {
    pub kept: usize,
    pub dropped: Vec<(usize, DropReason)>,
}

impl CleanReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Cleans an ONS timeseries CSV file into a [`Series`].
///
/// # Errors
///
/// Fails only on I/O; malformed rows are dropped and reported, never fatal.
pub fn clean_ons_timeseries(path: &Path, name: &str) -> Result<(Series, CleanReport)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading ONS export {}", path.display()))?;
    let (series, report) = clean_from_str(&raw, name);
    debug!(
        file = %path.display(),
        kept = report.kept,
        dropped = report.dropped_count(),
        "ONS series cleaned"
    );
    Ok((series, report))
}

/// Cleans raw ONS CSV text. Separated from file I/O so the parsing policy is
/// testable against inline fixtures.
pub fn clean_from_str(raw: &str, name: &str) -> (Series, CleanReport) {
    let lines: Vec<&str> = raw.lines().collect();
    let data_start = detect_data_start(&lines);
    let data_region = lines[data_start..].join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(data_region.as_bytes());

    let mut points = Vec::new();
    let mut report = CleanReport::default();

    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report
                    .dropped
                    .push((idx, DropReason::Unreadable(e.to_string())));
                continue;
            }
        };

        if record.len() < 2 {
            report.dropped.push((idx, DropReason::ShortRow));
            continue;
        }

        let date = match parse_ons_date(&record[0]) {
            Ok(d) => d,
            Err(e) => {
                report.dropped.push((idx, DropReason::BadDate(e)));
                continue;
            }
        };

        let value = match record[1].trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => {
                report
                    .dropped
                    .push((idx, DropReason::BadValue(record[1].to_string())));
                continue;
            }
        };

        points.push(SeriesPoint { date, value });
    }

    points.sort_by_key(|p| p.date);
    report.kept = points.len();

    (
        Series {
            name: name.to_string(),
            points,
        },
        report,
    )
}

/// Finds the first data row, skipping the metadata preamble.
///
/// A row is considered the header when the row after it starts with a digit
/// or a quoted digit. Falls back to the skip ladder the original exports are
/// known to need when nothing matches.
fn detect_data_start(lines: &[&str]) -> usize {
    for (i, line) in lines.iter().enumerate() {
        let looks_like_header = line.contains("Title") || line.contains(',');
        if !looks_like_header {
            continue;
        }
        if let Some(next) = lines.get(i + 1) {
            if row_starts_with_digit(next) {
                return i + 1;
            }
        }
    }

    // Skip ladder: most ONS generator exports put data after 7 or 8 rows.
    for skip in [7, 8, 6, 5] {
        if let Some(line) = lines.get(skip) {
            if row_starts_with_digit(line) {
                return skip;
            }
        }
    }

    0
}

fn row_starts_with_digit(line: &str) -> bool {
    let trimmed = line.trim_start_matches('"').trim();
    trimmed.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE: &str = "\
Title,CPI ANNUAL RATE 00: ALL ITEMS 2015=100
CDID,D7G7
Source dataset ID,MM23
PreUnit,
Unit,%
Release date,18-12-2024
Next release,15 January 2025
Important notes,
\"1989\",5.2
\"1989 Q1\",5.0
\"1989 JAN\",4.8
\"1989 FEB\",4.9
";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_clean_skips_preamble() {
        let (series, report) = clean_from_str(SAMPLE, "cpi_annual");
        assert_eq!(report.dropped_count(), 0);
        assert_eq!(series.len(), 4);
        // the bare annual row and "1989 JAN" both land on January 1st
        assert_eq!(series.points[0].date, d(1989, 1, 1));
        assert_eq!(series.points[1].date, d(1989, 1, 1));
        assert_eq!(series.points[2].date, d(1989, 2, 1));
        assert_eq!(series.points[3].date, d(1989, 3, 1));
    }

    #[test]
    fn test_annual_row_kept() {
        let raw = "date,value\n\"1989\",5.2\n\"1989 FEB\",4.9\n";
        let (series, report) = clean_from_str(raw, "s");
        assert_eq!(report.dropped_count(), 0);
        assert_eq!(series.points[0], SeriesPoint { date: d(1989, 1, 1), value: 5.2 });
    }

    #[test]
    fn test_doubled_quotes_unescape() {
        // RFC 4180: "" inside a quoted field is a literal quote, which makes
        // the token unparseable as a date rather than silently mangled.
        let raw = "date,value\n\"2020 \"\"JAN\"\"\",1.5\n\"2020 FEB\",1.3\n";
        let (series, report) = clean_from_str(raw, "s");
        assert_eq!(series.len(), 1);
        assert_eq!(series.points[0].date, d(2020, 2, 1));
        assert!(matches!(report.dropped[0].1, DropReason::BadDate(_)));
    }

    #[test]
    fn test_points_sorted_by_date() {
        let raw = "date,value\n2020 MAR,1.5\n2020 JAN,1.2\n2020 FEB,1.3\n";
        let (series, _) = clean_from_str(raw, "s");
        let dates: Vec<_> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2020, 1, 1), d(2020, 2, 1), d(2020, 3, 1)]);
    }

    #[test]
    fn test_bad_value_dropped_with_reason() {
        let raw = "date,value\n2020 JAN,1.2\n2020 FEB,n/a\n";
        let (series, report) = clean_from_str(raw, "s");
        assert_eq!(series.len(), 1);
        assert_eq!(report.kept, 1);
        assert!(matches!(report.dropped[0].1, DropReason::BadValue(_)));
    }

    #[test]
    fn test_bad_date_dropped_with_reason() {
        let raw = "date,value\n2020 JAN,1.2\nnot a date,3.4\n";
        let (series, report) = clean_from_str(raw, "s");
        assert_eq!(series.len(), 1);
        assert!(matches!(report.dropped[0].1, DropReason::BadDate(_)));
    }

    #[test]
    fn test_quoted_fields() {
        let raw = "date,value\n\"2020 JAN\",\"1.2\"\n";
        let (series, _) = clean_from_str(raw, "s");
        assert_eq!(series.len(), 1);
        assert_eq!(series.points[0].value, 1.2);
    }

    #[test]
    fn test_year_range() {
        let raw = "date,value\n2018 JAN,1.0\n2021 DEC,2.0\n";
        let (series, _) = clean_from_str(raw, "s");
        assert_eq!(series.year_range(), Some((2018, 2021)));
    }

    #[test]
    fn test_empty_input_yields_empty_series() {
        let (series, report) = clean_from_str("", "s");
        assert!(series.is_empty());
        assert_eq!(report.kept, 0);
    }
}
