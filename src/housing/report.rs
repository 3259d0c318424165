//! Report stage for the housing pipeline: chart-data artifacts and a
//! plain-text market summary over the cleaned London dataset.

use crate::charts::{ChartData, ChartPoint, single_series};
use crate::housing::clean::summarize;
use crate::housing::records::Transaction;
use crate::output;
use crate::util::mean;
use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<Transaction>() {
        rows.push(row?);
    }
    Ok(rows)
}

fn grouped_mean(groups: BTreeMap<String, Vec<f64>>) -> Vec<(String, f64, usize)> {
    groups
        .into_iter()
        .map(|(k, prices)| {
            let n = prices.len();
            (k, mean(&prices), n)
        })
        .collect()
}

fn group_prices(
    transactions: &[Transaction],
    key: impl Fn(&Transaction) -> String,
) -> Vec<(String, f64, usize)> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for t in transactions {
        groups.entry(key(t)).or_default().push(t.price);
    }
    grouped_mean(groups)
}

/// Band labels in ascending price order, for the distribution chart.
const BAND_ORDER: &[&str] = &[
    "Under £250k",
    "£250k-£500k",
    "£500k-£750k",
    "£750k-£1M",
    "£1M-£2M",
    "Over £2M",
];

fn chart_price_distribution(transactions: &[Transaction]) -> ChartData {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in transactions {
        *counts.entry(t.price_band.as_str()).or_default() += 1;
    }
    let points = BAND_ORDER
        .iter()
        .map(|band| ChartPoint {
            label: band.to_string(),
            value: counts.get(band).copied().unwrap_or(0) as f64,
        })
        .collect();
    single_series("Transactions by price band", "count", points)
}

fn chart_borough_prices(transactions: &[Transaction]) -> ChartData {
    let mut by_borough = group_prices(transactions, |t| t.district.clone());
    by_borough.sort_by(|a, b| b.1.total_cmp(&a.1));
    let points = by_borough
        .into_iter()
        .take(10)
        .map(|(label, value, _)| ChartPoint { label, value })
        .collect();
    single_series("Top boroughs by average price", "avg_price", points)
}

fn chart_monthly_trend(transactions: &[Transaction]) -> ChartData {
    // BTreeMap keys sort year-month chronologically.
    let points = group_prices(transactions, |t| t.year_month.clone())
        .into_iter()
        .map(|(label, value, _)| ChartPoint { label, value })
        .collect();
    single_series("Monthly average price", "avg_price", points)
}

fn chart_property_types(transactions: &[Transaction]) -> ChartData {
    let points = group_prices(transactions, |t| t.property_type_name.clone())
        .into_iter()
        .map(|(label, _, count)| ChartPoint {
            label,
            value: count as f64,
        })
        .collect();
    single_series("Transactions by property type", "count", points)
}

fn chart_regions(transactions: &[Transaction]) -> ChartData {
    let mut by_region = group_prices(transactions, |t| t.region.clone());
    by_region.sort_by(|a, b| b.1.total_cmp(&a.1));
    let points = by_region
        .into_iter()
        .map(|(label, value, _)| ChartPoint { label, value })
        .collect();
    single_series("Average price by region", "avg_price", points)
}

fn yearly_averages(transactions: &[Transaction]) -> Vec<(i32, f64)> {
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for t in transactions {
        groups.entry(t.year).or_default().push(t.price);
    }
    groups.into_iter().map(|(y, p)| (y, mean(&p))).collect()
}

fn chart_yoy_changes(transactions: &[Transaction]) -> ChartData {
    let yearly = yearly_averages(transactions);
    let points = yearly
        .windows(2)
        .filter(|w| w[0].1 != 0.0)
        .map(|w| ChartPoint {
            label: w[1].0.to_string(),
            value: (w[1].1 / w[0].1 - 1.0) * 100.0,
        })
        .collect();
    single_series("Year-on-year average price change", "yoy_pct", points)
}

fn build_report(transactions: &[Transaction]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "LONDON HOUSING MARKET REPORT");
    let _ = writeln!(out, "============================");
    let _ = writeln!(out);

    if let Some(s) = summarize(transactions) {
        let _ = writeln!(out, "OVERVIEW");
        let _ = writeln!(out, "  Transactions:    {}", s.total_transactions);
        let _ = writeln!(out, "  Date range:      {} to {}", s.date_min, s.date_max);
        let _ = writeln!(out, "  Average price:   £{:.0}", s.avg_price);
        let _ = writeln!(out, "  Median price:    £{:.0}", s.median_price);
        let _ = writeln!(
            out,
            "  Price range:     £{:.0} - £{:.0}",
            s.min_price, s.max_price
        );
        let _ = writeln!(out, "  Total value:     £{:.0}", s.total_value);
        let _ = writeln!(out, "  Unique postcodes: {}", s.unique_postcodes);
        let _ = writeln!(out, "  Boroughs:        {}", s.boroughs_covered);
        let _ = writeln!(out);
    }

    let mut by_borough = group_prices(transactions, |t| t.district.clone());
    by_borough.sort_by(|a, b| b.1.total_cmp(&a.1));

    let _ = writeln!(out, "TOP 10 BOROUGHS BY AVERAGE PRICE");
    for (borough, avg, count) in by_borough.iter().take(10) {
        let _ = writeln!(out, "  {borough:<26} £{avg:>11.0}  ({count} sales)");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "BOTTOM 5 BOROUGHS BY AVERAGE PRICE");
    for (borough, avg, count) in by_borough.iter().rev().take(5) {
        let _ = writeln!(out, "  {borough:<26} £{avg:>11.0}  ({count} sales)");
    }
    let _ = writeln!(out);

    let total = transactions.len() as f64;
    let _ = writeln!(out, "BY PROPERTY TYPE");
    for (ptype, avg, count) in group_prices(transactions, |t| t.property_type_name.clone()) {
        let _ = writeln!(
            out,
            "  {ptype:<18} {count:>8} ({:.1}%)  avg £{avg:.0}",
            count as f64 / total * 100.0
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "YEAR-ON-YEAR AVERAGE PRICE");
    let yearly = yearly_averages(transactions);
    for w in yearly.windows(2) {
        let change = if w[0].1 != 0.0 {
            (w[1].1 / w[0].1 - 1.0) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: £{:.0} ({change:+.1}%)", w[1].0, w[1].1);
    }
    if let Some((year, avg)) = yearly.first() {
        let _ = writeln!(out, "  (base {year}: £{avg:.0})");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "END OF REPORT");

    out
}

/// Runs the report stage against the cleaned dataset.
pub fn run(data_dir: &Path, out_dir: &Path) -> Result<()> {
    let cleaned_path = data_dir.join("processed/london_housing_cleaned.csv");
    if !cleaned_path.exists() {
        bail!(
            "{} not found; run the housing cleaning stage first",
            cleaned_path.display()
        );
    }

    let transactions = load_transactions(&cleaned_path)?;
    if transactions.is_empty() {
        bail!("cleaned dataset is empty");
    }

    let charts_dir = out_dir.join("charts");
    output::write_json(
        &charts_dir.join("housing_price_distribution.json"),
        &chart_price_distribution(&transactions),
    )?;
    output::write_json(
        &charts_dir.join("housing_borough_prices.json"),
        &chart_borough_prices(&transactions),
    )?;
    output::write_json(
        &charts_dir.join("housing_monthly_trend.json"),
        &chart_monthly_trend(&transactions),
    )?;
    output::write_json(
        &charts_dir.join("housing_property_types.json"),
        &chart_property_types(&transactions),
    )?;
    output::write_json(
        &charts_dir.join("housing_regions.json"),
        &chart_regions(&transactions),
    )?;
    output::write_json(
        &charts_dir.join("housing_yoy_changes.json"),
        &chart_yoy_changes(&transactions),
    )?;

    let report = build_report(&transactions);
    output::write_report(&out_dir.join("reports/housing_report.txt"), &report)?;

    info!(transactions = transactions.len(), "housing report finished");
    Ok(())
}
