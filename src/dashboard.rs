//! Filter boundary for the housing dashboard: an explicit filter model
//! applied to the in-memory transaction table, headline KPIs over the
//! filtered view, and CSV export of that view.

use crate::housing::records::Transaction;
use crate::output;
use crate::util::{mean, median};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Selected filter values. An empty set leaves that axis unconstrained;
/// the price range is inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub years: BTreeSet<i32>,
    pub boroughs: BTreeSet<String>,
    pub property_types: BTreeSet<String>,
    pub price_range: Option<(f64, f64)>,
}

impl FilterState {
    pub fn matches(&self, t: &Transaction) -> bool {
        if !self.years.is_empty() && !self.years.contains(&t.year) {
            return false;
        }
        if !self.boroughs.is_empty() && !self.boroughs.contains(&t.district) {
            return false;
        }
        if !self.property_types.is_empty()
            && !self.property_types.contains(&t.property_type_name)
        {
            return false;
        }
        if let Some((min, max)) = self.price_range {
            if t.price < min || t.price > max {
                return false;
            }
        }
        true
    }

    /// Subsets the transaction table to the rows matching every active axis.
    pub fn apply<'a>(&self, transactions: &'a [Transaction]) -> Vec<&'a Transaction> {
        transactions.iter().filter(|t| self.matches(t)).collect()
    }
}

/// Headline figures over a filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub transactions: usize,
    pub avg_price: f64,
    pub median_price: f64,
    pub total_value: f64,
    pub boroughs: usize,
}

pub fn compute_kpis(view: &[&Transaction]) -> Kpis {
    let prices: Vec<f64> = view.iter().map(|t| t.price).collect();
    let boroughs: BTreeSet<&str> = view.iter().map(|t| t.district.as_str()).collect();
    Kpis {
        transactions: view.len(),
        avg_price: if prices.is_empty() { 0.0 } else { mean(&prices) },
        median_price: median(&prices),
        total_value: prices.iter().sum(),
        boroughs: boroughs.len(),
    }
}

/// Loads the cleaned transaction table written by the housing pipeline.
pub fn load_transactions(data_dir: &Path) -> Result<Vec<Transaction>> {
    let path = data_dir.join("processed/london_housing_cleaned.csv");
    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("opening {}; run the housing cleaning stage first", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<Transaction>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Writes the current filtered view back out as CSV.
pub fn export_csv(path: &Path, view: &[&Transaction]) -> Result<()> {
    let owned: Vec<Transaction> = view.iter().map(|t| (*t).clone()).collect();
    output::write_csv(path, &owned)?;
    info!(path = %path.display(), rows = view.len(), "filtered view exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::housing::records::RawTransaction;
    use chrono::NaiveDate;

    fn tx(id: &str, price: f64, year: i32, district: &str, ptype: &str) -> Transaction {
        let raw = RawTransaction {
            transaction_id: id.to_string(),
            price: Some(price),
            date_of_transfer: None,
            postcode: Some("N1 9GU".to_string()),
            property_type: ptype.to_string(),
            old_new: "N".to_string(),
            duration: "L".to_string(),
            paon: None,
            saon: None,
            street: None,
            locality: None,
            town_city: None,
            district: Some(district.to_string()),
            county: None,
            ppd_category: "A".to_string(),
            record_status: "A".to_string(),
        };
        Transaction::derive(
            &raw,
            price,
            NaiveDate::from_ymd_opt(year, 6, 15).unwrap(),
            "N1 9GU".to_string(),
            district.to_string(),
        )
    }

    fn fixture() -> Vec<Transaction> {
        vec![
            tx("a", 400_000.0, 2022, "CAMDEN", "F"),
            tx("b", 800_000.0, 2023, "WESTMINSTER", "D"),
            tx("c", 300_000.0, 2023, "CAMDEN", "T"),
        ]
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let txs = fixture();
        let view = FilterState::default().apply(&txs);
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_year_and_borough_filters_combine() {
        let txs = fixture();
        let filter = FilterState {
            years: [2023].into_iter().collect(),
            boroughs: ["CAMDEN".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let view = filter.apply(&txs);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].transaction_id, "c");
    }

    #[test]
    fn test_price_range_is_inclusive() {
        let txs = fixture();
        let filter = FilterState {
            price_range: Some((300_000.0, 400_000.0)),
            ..Default::default()
        };
        assert_eq!(filter.apply(&txs).len(), 2);
    }

    #[test]
    fn test_property_type_filter_uses_names() {
        let txs = fixture();
        let filter = FilterState {
            property_types: ["Flat/Maisonette".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let view = filter.apply(&txs);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].transaction_id, "a");
    }

    #[test]
    fn test_kpis() {
        let txs = fixture();
        let view = FilterState::default().apply(&txs);
        let kpis = compute_kpis(&view);

        assert_eq!(kpis.transactions, 3);
        assert_eq!(kpis.avg_price, 500_000.0);
        assert_eq!(kpis.median_price, 400_000.0);
        assert_eq!(kpis.total_value, 1_500_000.0);
        assert_eq!(kpis.boroughs, 2);
    }

    #[test]
    fn test_kpis_on_empty_view() {
        let kpis = compute_kpis(&[]);
        assert_eq!(kpis.transactions, 0);
        assert_eq!(kpis.avg_price, 0.0);
        assert_eq!(kpis.total_value, 0.0);
    }

    #[test]
    fn test_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let txs = fixture();
        let view = FilterState::default().apply(&txs);

        export_csv(&path, &view).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<Transaction> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].transaction_id, "a");
    }
}
