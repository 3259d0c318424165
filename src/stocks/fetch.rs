//! Download stage for the FTSE pipeline.
//!
//! Daily history comes from Stooq's CSV endpoint, one request per ticker.
//! A ticker that fails to download or parse is logged and skipped; the
//! combined raw dataset is written with whatever survived.

use crate::fetch::{HttpClient, fetch_bytes};
use crate::output;
use crate::stocks::universe::{FTSE_INDEX, FTSE_UNIVERSE, Listing};
use crate::stocks::{Bar, metrics};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{error, info};

/// Raw row shape of Stooq's daily-history CSV.
#[derive(Debug, Deserialize)]
struct StooqRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: Option<f64>,
}

/// Maps a London Stock Exchange ticker to Stooq's symbol scheme: lowercase,
/// with the ".L" suffix replaced by ".uk". The index symbol passes through
/// unchanged apart from case.
pub fn stooq_symbol(ticker: &str) -> String {
    let lower = ticker.to_lowercase();
    match lower.strip_suffix(".l") {
        Some(base) => format!("{base}.uk"),
        None => lower,
    }
}

fn history_url(ticker: &str) -> String {
    format!("https://stooq.com/q/d/l/?s={}&i=d", stooq_symbol(ticker))
}

/// Parses a Stooq daily-history CSV body into bars tagged with the listing's
/// company and sector. Malformed rows are dropped.
pub fn parse_history_csv(raw: &[u8], listing: &Listing) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_reader(raw);
    let mut bars = Vec::new();
    let mut dropped = 0usize;

    for row in reader.deserialize::<StooqRow>() {
        match row {
            Ok(r) => bars.push(Bar::new(
                r.date, listing, r.open, r.high, r.low, r.close, r.volume,
            )),
            Err(_) => dropped += 1,
        }
    }

    if bars.is_empty() {
        bail!("no parseable rows for {}", listing.ticker);
    }
    if dropped > 0 {
        info!(ticker = listing.ticker, dropped, "dropped malformed rows");
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

async fn fetch_listing<C: HttpClient>(client: &C, listing: &Listing) -> Result<Vec<Bar>> {
    let url = history_url(listing.ticker);
    let body = fetch_bytes(client, &url)
        .await
        .with_context(|| format!("fetching history for {}", listing.ticker))?;
    parse_history_csv(&body, listing)
}

/// Runs the full fetch stage: downloads history for the index and every
/// universe member, computes per-ticker metrics, and writes the combined
/// raw dataset to `data/ftse_stock_data_raw.csv`.
pub async fn run<C: HttpClient>(client: &C, data_dir: &Path) -> Result<()> {
    let mut all_bars: Vec<Bar> = Vec::new();
    let mut fetched = 0usize;

    for listing in FTSE_UNIVERSE.iter().chain(std::iter::once(&FTSE_INDEX)) {
        match fetch_listing(client, listing).await {
            Ok(mut bars) => {
                metrics::enrich(&mut bars);
                info!(ticker = listing.ticker, rows = bars.len(), "fetched");
                all_bars.extend(bars);
                fetched += 1;
            }
            Err(e) => {
                error!(ticker = listing.ticker, error = %e, "fetch failed, skipping");
            }
        }
    }

    if all_bars.is_empty() {
        bail!("no ticker history could be fetched");
    }

    let companies: BTreeSet<&str> = all_bars.iter().map(|b| b.ticker.as_str()).collect();
    let sectors: BTreeSet<&str> = all_bars.iter().map(|b| b.sector.as_str()).collect();
    info!(
        tickers = fetched,
        records = all_bars.len(),
        companies = companies.len(),
        sectors = sectors.len(),
        "FTSE fetch finished"
    );

    output::write_csv(&data_dir.join("ftse_stock_data_raw.csv"), &all_bars)?;
    output::append_record(
        &data_dir.join("run_history.csv"),
        &output::RunRecord::new("fetch-stocks", all_bars.len()),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stooq_symbol_maps_lse_suffix() {
        assert_eq!(stooq_symbol("SHEL.L"), "shel.uk");
        assert_eq!(stooq_symbol("BT-A.L"), "bt-a.uk");
    }

    #[test]
    fn test_stooq_symbol_passes_index_through() {
        assert_eq!(stooq_symbol("^FTSE"), "^ftse");
    }

    #[test]
    fn test_parse_history_csv() {
        let raw = b"Date,Open,High,Low,Close,Volume\n\
                    2024-01-02,2500,2550,2480,2540,1200000\n\
                    2024-01-03,2540,2560,2520,2530,900000\n";
        let bars = parse_history_csv(raw, &FTSE_UNIVERSE[0]).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ticker, "SHEL.L");
        assert_eq!(bars[0].close, 2540.0);
        assert_eq!(bars[1].volume, Some(900000.0));
    }

    #[test]
    fn test_parse_history_drops_malformed_rows() {
        let raw = b"Date,Open,High,Low,Close,Volume\n\
                    2024-01-02,2500,2550,2480,2540,1200000\n\
                    not-a-date,x,y,z,w,v\n";
        let bars = parse_history_csv(raw, &FTSE_UNIVERSE[0]).unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn test_parse_history_all_bad_is_error() {
        let raw = b"Date,Open,High,Low,Close,Volume\nnope,,,,,\n";
        assert!(parse_history_csv(raw, &FTSE_UNIVERSE[0]).is_err());
    }
}
