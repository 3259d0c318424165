//! Grouped summary tables over cleaned London transactions.

use crate::housing::records::Transaction;
use crate::util::{mean, median};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyBorough {
    pub year_month: String,
    pub district: String,
    pub avg_price: f64,
    pub median_price: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyBorough {
    pub year: i32,
    pub district: String,
    pub avg_price: f64,
    pub median_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub year: i32,
    pub property_type: String,
    pub avg_price: f64,
    pub median_price: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalSummary {
    pub year: i32,
    pub region: String,
    pub avg_price: f64,
    pub median_price: f64,
    pub transaction_count: usize,
}

/// All four aggregate tables derived from one pass over the transactions.
#[derive(Debug, Default)]
pub struct Aggregates {
    pub monthly_borough: Vec<MonthlyBorough>,
    pub yearly_borough: Vec<YearlyBorough>,
    pub property_summary: Vec<PropertySummary>,
    pub regional_summary: Vec<RegionalSummary>,
}

fn grouped_prices<K: Ord>(
    transactions: &[Transaction],
    key: impl Fn(&Transaction) -> K,
) -> BTreeMap<K, Vec<f64>> {
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for t in transactions {
        groups.entry(key(t)).or_default().push(t.price);
    }
    groups
}

pub fn build(transactions: &[Transaction]) -> Aggregates {
    let monthly_borough = grouped_prices(transactions, |t| {
        (t.year_month.clone(), t.district.clone())
    })
    .into_iter()
    .map(|((year_month, district), prices)| MonthlyBorough {
        year_month,
        district,
        avg_price: mean(&prices),
        median_price: median(&prices),
        transaction_count: prices.len(),
    })
    .collect();

    let yearly_borough = grouped_prices(transactions, |t| (t.year, t.district.clone()))
        .into_iter()
        .map(|((year, district), prices)| YearlyBorough {
            year,
            district,
            avg_price: mean(&prices),
            median_price: median(&prices),
            min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            transaction_count: prices.len(),
        })
        .collect();

    let property_summary = grouped_prices(transactions, |t| {
        (t.year, t.property_type_name.clone())
    })
    .into_iter()
    .map(|((year, property_type), prices)| PropertySummary {
        year,
        property_type,
        avg_price: mean(&prices),
        median_price: median(&prices),
        transaction_count: prices.len(),
    })
    .collect();

    let regional_summary = grouped_prices(transactions, |t| (t.year, t.region.clone()))
        .into_iter()
        .map(|((year, region), prices)| RegionalSummary {
            year,
            region,
            avg_price: mean(&prices),
            median_price: median(&prices),
            transaction_count: prices.len(),
        })
        .collect();

    Aggregates {
        monthly_borough,
        yearly_borough,
        property_summary,
        regional_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::housing::records::RawTransaction;
    use chrono::NaiveDate;

    fn tx(id: &str, price: f64, date: (i32, u32, u32), district: &str, ptype: &str) -> Transaction {
        let raw = RawTransaction {
            transaction_id: id.to_string(),
            price: Some(price),
            date_of_transfer: None,
            postcode: Some("SW1A 1AA".to_string()),
            property_type: ptype.to_string(),
            old_new: "N".to_string(),
            duration: "F".to_string(),
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
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            "SW1A 1AA".to_string(),
            district.to_string(),
        )
    }

    #[test]
    fn test_yearly_borough_aggregation() {
        let txs = vec![
            tx("a", 400_000.0, (2023, 1, 5), "CAMDEN", "F"),
            tx("b", 600_000.0, (2023, 6, 5), "CAMDEN", "T"),
            tx("c", 300_000.0, (2024, 1, 5), "CAMDEN", "F"),
        ];
        let agg = build(&txs);

        assert_eq!(agg.yearly_borough.len(), 2);
        let y2023 = &agg.yearly_borough[0];
        assert_eq!(y2023.year, 2023);
        assert_eq!(y2023.transaction_count, 2);
        assert_eq!(y2023.avg_price, 500_000.0);
        assert_eq!(y2023.min_price, 400_000.0);
        assert_eq!(y2023.max_price, 600_000.0);
    }

    #[test]
    fn test_regional_summary_uses_region_names() {
        let txs = vec![
            tx("a", 400_000.0, (2023, 1, 5), "CAMDEN", "F"),
            tx("b", 350_000.0, (2023, 2, 5), "BEXLEY", "S"),
        ];
        let agg = build(&txs);

        let regions: Vec<&str> = agg
            .regional_summary
            .iter()
            .map(|r| r.region.as_str())
            .collect();
        assert_eq!(regions, vec!["Central", "East"]);
    }

    #[test]
    fn test_monthly_key_includes_month() {
        let txs = vec![
            tx("a", 100_000.0, (2023, 1, 5), "CAMDEN", "F"),
            tx("b", 200_000.0, (2023, 2, 5), "CAMDEN", "F"),
        ];
        let agg = build(&txs);
        assert_eq!(agg.monthly_borough.len(), 2);
        assert_eq!(agg.monthly_borough[0].year_month, "2023-01");
    }
}
