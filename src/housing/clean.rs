//! Cleaning stage for the housing pipeline: loads the filtered London files,
//! applies the cleaning rules with per-record drop accounting, builds the
//! aggregate tables, and stores everything in SQLite.

use crate::db::Store;
use crate::housing::aggregate::{self, Aggregates};
use crate::housing::records::{RawTransaction, Transaction};
use crate::output;
use crate::util::{mean, median};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::params;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Lower/upper sale-price bounds; anything outside is treated as a data
/// error (nominal £1 transfers, typo prices).
pub const PRICE_MIN: f64 = 10_000.0;
pub const PRICE_MAX: f64 = 50_000_000.0;

/// Why a raw row was dropped during cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Duplicate,
    MissingEssential,
    BadDate(String),
    PriceOutOfBounds,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate => write!(f, "duplicate transaction id"),
            Self::MissingEssential => write!(f, "missing price/date/postcode/district"),
            Self::BadDate(raw) => write!(f, "unparseable date {raw:?}"),
            Self::PriceOutOfBounds => write!(f, "price outside [{PRICE_MIN}, {PRICE_MAX}]"),
        }
    }
}

/// Per-run cleaning accounting.
#[derive(Debug, Default)]
pub struct CleanStats {
    pub input: usize,
    pub kept: usize,
    pub duplicates: usize,
    pub missing_essentials: usize,
    pub bad_dates: usize,
    pub price_outliers: usize,
}

impl CleanStats {
    fn record(&mut self, reason: &DropReason) {
        match reason {
            DropReason::Duplicate => self.duplicates += 1,
            DropReason::MissingEssential => self.missing_essentials += 1,
            DropReason::BadDate(_) => self.bad_dates += 1,
            DropReason::PriceOutOfBounds => self.price_outliers += 1,
        }
    }
}

/// Price Paid dates come as "2023-08-15 00:00"; filtered re-exports may carry
/// the bare date.
fn parse_transfer_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn clean_one(raw: &RawTransaction, seen: &mut BTreeSet<String>) -> Result<Transaction, DropReason> {
    if !seen.insert(raw.transaction_id.clone()) {
        return Err(DropReason::Duplicate);
    }

    let (Some(price), Some(date_raw), Some(postcode), Some(district)) = (
        raw.price,
        raw.date_of_transfer.as_deref(),
        raw.postcode.as_deref(),
        raw.district.as_deref(),
    ) else {
        return Err(DropReason::MissingEssential);
    };
    if postcode.trim().is_empty() || district.trim().is_empty() {
        return Err(DropReason::MissingEssential);
    }

    let date = parse_transfer_date(date_raw)
        .ok_or_else(|| DropReason::BadDate(date_raw.to_string()))?;

    if !(PRICE_MIN..=PRICE_MAX).contains(&price) {
        return Err(DropReason::PriceOutOfBounds);
    }

    Ok(Transaction::derive(
        raw,
        price,
        date,
        postcode.trim().to_string(),
        district.trim().to_uppercase(),
    ))
}

/// Applies all cleaning rules, returning the surviving transactions plus
/// drop accounting.
pub fn clean(raw: Vec<RawTransaction>) -> (Vec<Transaction>, CleanStats) {
    let mut stats = CleanStats {
        input: raw.len(),
        ..Default::default()
    };
    let mut seen = BTreeSet::new();
    let mut kept = Vec::with_capacity(raw.len());

    for row in &raw {
        match clean_one(row, &mut seen) {
            Ok(t) => kept.push(t),
            Err(reason) => stats.record(&reason),
        }
    }

    stats.kept = kept.len();
    info!(
        input = stats.input,
        kept = stats.kept,
        duplicates = stats.duplicates,
        missing = stats.missing_essentials,
        bad_dates = stats.bad_dates,
        outliers = stats.price_outliers,
        "housing clean finished"
    );
    (kept, stats)
}

/// Loads every london-pp-*.csv under `processed_dir`.
pub fn load_london_files(processed_dir: &Path) -> Result<Vec<RawTransaction>> {
    let mut all = Vec::new();
    let mut files = 0usize;

    let entries = std::fs::read_dir(processed_dir)
        .with_context(|| format!("reading {}", processed_dir.display()))?;
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("london-pp-") && n.ends_with(".csv"))
        })
        .collect();
    paths.sort();

    for path in paths {
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        let before = all.len();
        for row in reader.deserialize::<RawTransaction>() {
            match row {
                Ok(raw) => all.push(raw),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping bad row"),
            }
        }
        info!(file = %path.display(), rows = all.len() - before, "loaded");
        files += 1;
    }

    if files == 0 {
        bail!(
            "no london-pp-*.csv files under {}; run the housing fetch stage first",
            processed_dir.display()
        );
    }
    Ok(all)
}

/// Overview statistics logged and reused by the report stage.
#[derive(Debug)]
pub struct HousingSummary {
    pub total_transactions: usize,
    pub date_min: NaiveDate,
    pub date_max: NaiveDate,
    pub avg_price: f64,
    pub median_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_value: f64,
    pub unique_postcodes: usize,
    pub boroughs_covered: usize,
}

pub fn summarize(transactions: &[Transaction]) -> Option<HousingSummary> {
    if transactions.is_empty() {
        return None;
    }
    let prices: Vec<f64> = transactions.iter().map(|t| t.price).collect();
    let postcodes: BTreeSet<&str> = transactions.iter().map(|t| t.postcode.as_str()).collect();
    let districts: BTreeSet<&str> = transactions.iter().map(|t| t.district.as_str()).collect();

    Some(HousingSummary {
        total_transactions: transactions.len(),
        date_min: transactions.iter().map(|t| t.date_of_transfer).min()?,
        date_max: transactions.iter().map(|t| t.date_of_transfer).max()?,
        avg_price: mean(&prices),
        median_price: median(&prices),
        min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
        max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        total_value: prices.iter().sum(),
        unique_postcodes: postcodes.len(),
        boroughs_covered: districts.len(),
    })
}

/// Persists the transactions and all aggregate tables, then builds the query
/// indexes.
pub fn save_to_store(
    store: &Store,
    transactions: &[Transaction],
    aggregates: &Aggregates,
) -> Result<()> {
    store.recreate_table(
        "transactions",
        "transaction_id TEXT PRIMARY KEY,
         price REAL NOT NULL,
         date_of_transfer TEXT NOT NULL,
         postcode TEXT NOT NULL,
         property_type TEXT,
         property_type_name TEXT,
         old_new TEXT,
         duration TEXT,
         district TEXT NOT NULL,
         region TEXT,
         year INTEGER,
         month INTEGER,
         quarter INTEGER,
         year_month TEXT,
         postcode_district TEXT,
         price_band TEXT",
    )?;
    store.recreate_table(
        "monthly_borough",
        "year_month TEXT, district TEXT, avg_price REAL, median_price REAL,
         transaction_count INTEGER",
    )?;
    store.recreate_table(
        "yearly_borough",
        "year INTEGER, district TEXT, avg_price REAL, median_price REAL,
         min_price REAL, max_price REAL, transaction_count INTEGER",
    )?;
    store.recreate_table(
        "property_summary",
        "year INTEGER, property_type TEXT, avg_price REAL, median_price REAL,
         transaction_count INTEGER",
    )?;
    store.recreate_table(
        "regional_summary",
        "year INTEGER, region TEXT, avg_price REAL, median_price REAL,
         transaction_count INTEGER",
    )?;

    let tx = store.conn().unchecked_transaction()?;
    {
        let mut insert = tx.prepare(
            "INSERT INTO transactions VALUES
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;
        for t in transactions {
            insert.execute(params![
                t.transaction_id,
                t.price,
                t.date_of_transfer.format("%Y-%m-%d").to_string(),
                t.postcode,
                t.property_type,
                t.property_type_name,
                t.old_new,
                t.duration,
                t.district,
                t.region,
                t.year,
                t.month,
                t.quarter,
                t.year_month,
                t.postcode_district,
                t.price_band,
            ])?;
        }

        let mut insert = tx.prepare("INSERT INTO monthly_borough VALUES (?1, ?2, ?3, ?4, ?5)")?;
        for r in &aggregates.monthly_borough {
            insert.execute(params![
                r.year_month,
                r.district,
                r.avg_price,
                r.median_price,
                r.transaction_count,
            ])?;
        }

        let mut insert =
            tx.prepare("INSERT INTO yearly_borough VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")?;
        for r in &aggregates.yearly_borough {
            insert.execute(params![
                r.year,
                r.district,
                r.avg_price,
                r.median_price,
                r.min_price,
                r.max_price,
                r.transaction_count,
            ])?;
        }

        let mut insert = tx.prepare("INSERT INTO property_summary VALUES (?1, ?2, ?3, ?4, ?5)")?;
        for r in &aggregates.property_summary {
            insert.execute(params![
                r.year,
                r.property_type,
                r.avg_price,
                r.median_price,
                r.transaction_count,
            ])?;
        }

        let mut insert = tx.prepare("INSERT INTO regional_summary VALUES (?1, ?2, ?3, ?4, ?5)")?;
        for r in &aggregates.regional_summary {
            insert.execute(params![
                r.year,
                r.region,
                r.avg_price,
                r.median_price,
                r.transaction_count,
            ])?;
        }
    }
    tx.commit()?;

    store.create_index("idx_district", "transactions", "district")?;
    store.create_index("idx_year", "transactions", "year")?;
    store.create_index("idx_postcode", "transactions", "postcode")?;
    store.create_index("idx_property_type", "transactions", "property_type")?;

    info!(
        transactions = transactions.len(),
        monthly_borough = aggregates.monthly_borough.len(),
        yearly_borough = aggregates.yearly_borough.len(),
        "housing database written"
    );
    Ok(())
}

/// Runs the full cleaning stage.
pub fn run(data_dir: &Path) -> Result<CleanStats> {
    let processed_dir = data_dir.join("processed");
    let raw = load_london_files(&processed_dir)?;
    let (transactions, stats) = clean(raw);
    if transactions.is_empty() {
        bail!("no transactions survived cleaning");
    }

    if let Some(summary) = summarize(&transactions) {
        info!(
            transactions = summary.total_transactions,
            from = %summary.date_min,
            to = %summary.date_max,
            avg_price = summary.avg_price as i64,
            median_price = summary.median_price as i64,
            boroughs = summary.boroughs_covered,
            "cleaned dataset summary"
        );
    }

    let aggregates = aggregate::build(&transactions);

    let store = Store::open(&data_dir.join("housing_market.db"))?;
    save_to_store(&store, &transactions, &aggregates)?;
    store.close()?;

    output::write_csv(
        &processed_dir.join("london_housing_cleaned.csv"),
        &transactions,
    )?;

    output::append_record(
        &data_dir.join("run_history.csv"),
        &output::RunRecord::new("clean-housing", stats.kept),
    )?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, price: Option<f64>, date: Option<&str>, district: Option<&str>) -> RawTransaction {
        RawTransaction {
            transaction_id: id.to_string(),
            price,
            date_of_transfer: date.map(str::to_string),
            postcode: Some("SW1A 1AA".to_string()),
            property_type: "F".to_string(),
            old_new: "N".to_string(),
            duration: "L".to_string(),
            paon: None,
            saon: None,
            street: None,
            locality: None,
            town_city: None,
            district: district.map(str::to_string),
            county: None,
            ppd_category: "A".to_string(),
            record_status: "A".to_string(),
        }
    }

    #[test]
    fn test_clean_dedupes_and_bounds() {
        let rows = vec![
            raw("a", Some(450_000.0), Some("2023-08-15 00:00"), Some("camden ")),
            raw("a", Some(450_000.0), Some("2023-08-15 00:00"), Some("CAMDEN")),
            raw("b", Some(5_000.0), Some("2023-08-15 00:00"), Some("CAMDEN")),
            raw("c", None, Some("2023-08-15 00:00"), Some("CAMDEN")),
            raw("d", Some(450_000.0), Some("not a date"), Some("CAMDEN")),
        ];
        let (kept, stats) = clean(rows);

        assert_eq!(kept.len(), 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.price_outliers, 1);
        assert_eq!(stats.missing_essentials, 1);
        assert_eq!(stats.bad_dates, 1);
        // District is trimmed and uppercased.
        assert_eq!(kept[0].district, "CAMDEN");
        assert_eq!(kept[0].year, 2023);
    }

    #[test]
    fn test_parse_transfer_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2023, 8, 15).unwrap();
        assert_eq!(parse_transfer_date("2023-08-15 00:00"), Some(expected));
        assert_eq!(parse_transfer_date("2023-08-15"), Some(expected));
        assert_eq!(parse_transfer_date("15/08/2023"), None);
    }

    #[test]
    fn test_summarize() {
        let rows = vec![
            raw("a", Some(400_000.0), Some("2023-01-10 00:00"), Some("CAMDEN")),
            raw("b", Some(600_000.0), Some("2024-03-10 00:00"), Some("BEXLEY")),
        ];
        let (kept, _) = clean(rows);
        let s = summarize(&kept).unwrap();

        assert_eq!(s.total_transactions, 2);
        assert_eq!(s.avg_price, 500_000.0);
        assert_eq!(s.total_value, 1_000_000.0);
        assert_eq!(s.boroughs_covered, 2);
        assert_eq!(s.date_min, NaiveDate::from_ymd_opt(2023, 1, 10).unwrap());
    }

    #[test]
    fn test_save_to_store_row_counts() {
        let rows = vec![
            raw("a", Some(400_000.0), Some("2023-01-10 00:00"), Some("CAMDEN")),
            raw("b", Some(600_000.0), Some("2023-02-10 00:00"), Some("CAMDEN")),
        ];
        let (kept, _) = clean(rows);
        let aggregates = aggregate::build(&kept);

        let store = Store::open_in_memory().unwrap();
        save_to_store(&store, &kept, &aggregates).unwrap();

        assert_eq!(store.count("transactions").unwrap(), 2);
        assert_eq!(store.count("monthly_borough").unwrap(), 2);
        assert_eq!(store.count("yearly_borough").unwrap(), 1);
        assert_eq!(store.count("property_summary").unwrap(), 1);
        assert_eq!(store.count("regional_summary").unwrap(), 1);
    }

    #[test]
    fn test_load_requires_fetched_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_london_files(dir.path()).unwrap_err();
        assert!(err.to_string().contains("fetch stage"));
    }
}
