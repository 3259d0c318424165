//! FTSE 100 pipeline: daily OHLCV history for a fixed universe, per-ticker
//! metrics, and sector performance aggregation.

pub mod fetch;
pub mod metrics;
pub mod performance;
pub mod report;
pub mod universe;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day for one ticker, with derived metrics filled in by
/// [`metrics::enrich`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub ticker: String,
    pub company: String,
    pub sector: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,

    // derived
    pub daily_return: Option<f64>,
    pub volatility_20d: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_200: Option<f64>,
    pub price_vs_ma50: Option<f64>,
}

impl Bar {
    pub fn new(
        date: NaiveDate,
        listing: &universe::Listing,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Self {
        Self {
            date,
            ticker: listing.ticker.to_string(),
            company: listing.company.to_string(),
            sector: listing.sector.to_string(),
            open,
            high,
            low,
            close,
            volume,
            daily_return: None,
            volatility_20d: None,
            ma_50: None,
            ma_200: None,
            price_vs_ma50: None,
        }
    }
}
