//! Chart-data documents written as JSON artifacts.
//!
//! Each chart the pipelines used to render is exported as a labeled series
//! document; a dashboard or notebook renders them without re-running the
//! pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single labeled data point within a chart series.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// A named series of points (one line or bar group).
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// A complete chart-data document.
#[derive(Debug, Serialize)]
pub struct ChartData {
    pub schema_version: u8,
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub series: Vec<ChartSeries>,
}

impl ChartData {
    pub fn new(title: &str, series: Vec<ChartSeries>) -> Self {
        Self {
            schema_version: 1,
            title: title.to_string(),
            generated_at: Utc::now(),
            series,
        }
    }
}

/// Convenience constructor for a single-series chart.
pub fn single_series(title: &str, name: &str, points: Vec<ChartPoint>) -> ChartData {
    ChartData::new(
        title,
        vec![ChartSeries {
            name: name.to_string(),
            points,
        }],
    )
}
