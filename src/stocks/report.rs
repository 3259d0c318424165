//! Analysis stage for the FTSE pipeline: loads the raw bar table, builds
//! performance summaries, and writes the CSV, chart, and report artifacts.

use crate::charts::{ChartData, ChartPoint, ChartSeries, single_series};
use crate::output;
use crate::stocks::Bar;
use crate::stocks::performance::{
    SectorPerformance, TickerPerformance, calculate_performance, group_by_ticker,
    monthly_sector_returns, return_correlations, sector_performance,
};
use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut bars = Vec::new();
    for row in reader.deserialize::<Bar>() {
        bars.push(row?);
    }
    Ok(bars)
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:+.2}%"),
        None => "n/a".to_string(),
    }
}

fn chart_sector_returns(sectors: &[SectorPerformance]) -> ChartData {
    let window = |pick: fn(&SectorPerformance) -> Option<f64>| {
        sectors
            .iter()
            .filter_map(|s| {
                pick(s).map(|v| ChartPoint {
                    label: s.sector.clone(),
                    value: v,
                })
            })
            .collect::<Vec<_>>()
    };

    ChartData::new(
        "Sector returns",
        vec![
            ChartSeries {
                name: "return_3m".to_string(),
                points: window(|s| s.return_3m),
            },
            ChartSeries {
                name: "return_1y".to_string(),
                points: window(|s| s.return_1y),
            },
        ],
    )
}

fn chart_top_performers(perf: &[TickerPerformance]) -> ChartData {
    // `perf` is already sorted by 1-year return descending.
    let ranked: Vec<ChartPoint> = perf
        .iter()
        .filter(|p| p.sector != "Index")
        .filter_map(|p| {
            p.return_1y.map(|v| ChartPoint {
                label: p.company.clone(),
                value: v,
            })
        })
        .collect();

    let top = ranked.iter().take(10).cloned().collect();
    let bottom = ranked.iter().rev().take(10).cloned().collect();

    ChartData::new(
        "Top and bottom performers by 1-year return",
        vec![
            ChartSeries {
                name: "top_10".to_string(),
                points: top,
            },
            ChartSeries {
                name: "bottom_10".to_string(),
                points: bottom,
            },
        ],
    )
}

fn chart_correlation_matrix(grouped: &BTreeMap<String, Vec<Bar>>) -> ChartData {
    let mut series: Vec<ChartSeries> = Vec::new();
    for pair in return_correlations(grouped) {
        let point = ChartPoint {
            label: pair.company_b,
            value: pair.correlation,
        };
        match series.iter_mut().find(|s| s.name == pair.company_a) {
            Some(s) => s.points.push(point),
            None => series.push(ChartSeries {
                name: pair.company_a,
                points: vec![point],
            }),
        }
    }
    ChartData::new("Daily return correlations", series)
}

fn chart_monthly_returns(grouped: &BTreeMap<String, Vec<Bar>>) -> ChartData {
    let rows = monthly_sector_returns(grouped);

    // Most recent twelve months only.
    let months: BTreeSet<&str> = rows.iter().map(|r| r.year_month.as_str()).collect();
    let keep: BTreeSet<&str> = months.iter().rev().take(12).copied().collect();

    let mut series: Vec<ChartSeries> = Vec::new();
    for row in &rows {
        if !keep.contains(row.year_month.as_str()) {
            continue;
        }
        let point = ChartPoint {
            label: row.year_month.clone(),
            value: row.return_pct,
        };
        match series.iter_mut().find(|s| s.name == row.sector) {
            Some(s) => s.points.push(point),
            None => series.push(ChartSeries {
                name: row.sector.clone(),
                points: vec![point],
            }),
        }
    }
    ChartData::new("Monthly returns by sector", series)
}

fn chart_volatility(perf: &[TickerPerformance]) -> ChartData {
    let mut by_vol: Vec<&TickerPerformance> = perf
        .iter()
        .filter(|p| p.sector != "Index" && p.volatility.is_some())
        .collect();
    by_vol.sort_by(|a, b| {
        b.volatility
            .unwrap_or(0.0)
            .total_cmp(&a.volatility.unwrap_or(0.0))
    });

    let points = by_vol
        .iter()
        .filter_map(|p| {
            p.volatility.map(|v| ChartPoint {
                label: p.company.clone(),
                value: v,
            })
        })
        .collect();
    single_series("Average 20-day volatility", "volatility", points)
}

fn build_report(perf: &[TickerPerformance], sectors: &[SectorPerformance]) -> String {
    let mut out = String::new();
    let stocks: Vec<&TickerPerformance> =
        perf.iter().filter(|p| p.sector != "Index").collect();

    let _ = writeln!(out, "FTSE 100 PERFORMANCE REPORT");
    let _ = writeln!(out, "===========================");
    let _ = writeln!(out);

    if let Some(index) = perf.iter().find(|p| p.sector == "Index") {
        let _ = writeln!(out, "BENCHMARK ({})", index.company);
        let _ = writeln!(out, "  Level:        {:.1}", index.current_price);
        let _ = writeln!(out, "  1M return:    {}", fmt_opt(index.return_1m));
        let _ = writeln!(out, "  1Y return:    {}", fmt_opt(index.return_1y));
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "TOP 5 BY 1-YEAR RETURN");
    for p in stocks.iter().take(5) {
        let _ = writeln!(
            out,
            "  {:<28} {:>10}  ({})",
            p.company,
            fmt_opt(p.return_1y),
            p.sector
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "BOTTOM 5 BY 1-YEAR RETURN");
    for p in stocks.iter().rev().take(5) {
        let _ = writeln!(
            out,
            "  {:<28} {:>10}  ({})",
            p.company,
            fmt_opt(p.return_1y),
            p.sector
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "SECTOR RANKING (1-YEAR RETURN)");
    for s in sectors {
        let _ = writeln!(
            out,
            "  {:<18} {:>10}  ({} companies)",
            s.sector,
            fmt_opt(s.return_1y),
            s.companies
        );
    }
    let _ = writeln!(out);

    if let Some(most_volatile) = stocks
        .iter()
        .filter(|p| p.volatility.is_some())
        .max_by(|a, b| {
            a.volatility
                .unwrap_or(0.0)
                .total_cmp(&b.volatility.unwrap_or(0.0))
        })
    {
        let _ = writeln!(
            out,
            "MOST VOLATILE: {} ({})",
            most_volatile.company,
            fmt_opt(most_volatile.volatility)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "END OF REPORT");

    out
}

/// Runs the analysis stage against the raw dataset written by the fetch
/// stage.
pub fn run(data_dir: &Path, out_dir: &Path) -> Result<()> {
    let raw_path = data_dir.join("ftse_stock_data_raw.csv");
    if !raw_path.exists() {
        bail!(
            "{} not found; run the stock fetch stage first",
            raw_path.display()
        );
    }

    let bars = load_bars(&raw_path)?;
    let grouped = group_by_ticker(bars);
    let perf = calculate_performance(&grouped);
    if perf.is_empty() {
        bail!("no ticker had enough history to analyze");
    }
    let sectors = sector_performance(&perf);

    output::write_csv(&data_dir.join("ftse_performance.csv"), &perf)?;
    output::write_csv(&data_dir.join("ftse_sector_performance.csv"), &sectors)?;

    let charts_dir = out_dir.join("charts");
    output::write_json(
        &charts_dir.join("ftse_sector_returns.json"),
        &chart_sector_returns(&sectors),
    )?;
    output::write_json(
        &charts_dir.join("ftse_top_performers.json"),
        &chart_top_performers(&perf),
    )?;
    output::write_json(
        &charts_dir.join("ftse_volatility.json"),
        &chart_volatility(&perf),
    )?;
    output::write_json(
        &charts_dir.join("ftse_correlation_matrix.json"),
        &chart_correlation_matrix(&grouped),
    )?;
    output::write_json(
        &charts_dir.join("ftse_monthly_returns.json"),
        &chart_monthly_returns(&grouped),
    )?;

    let report = build_report(&perf, &sectors);
    output::write_report(&out_dir.join("reports").join("ftse_report.txt"), &report)?;

    info!(
        tickers = perf.len(),
        sectors = sectors.len(),
        "FTSE analysis finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stocks::universe::{FTSE_INDEX, FTSE_UNIVERSE};
    use chrono::NaiveDate;

    fn bars_for(listing: &crate::stocks::universe::Listing, n: usize, start: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64);
                let close = start + i as f64;
                Bar::new(date, listing, close, close, close, close, Some(500.0))
            })
            .collect()
    }

    fn fixture() -> (Vec<TickerPerformance>, Vec<SectorPerformance>) {
        let mut bars = bars_for(&FTSE_UNIVERSE[0], 60, 100.0);
        bars.extend(bars_for(&FTSE_UNIVERSE[2], 60, 400.0));
        bars.extend(bars_for(&FTSE_INDEX, 60, 7500.0));
        let perf = calculate_performance(&group_by_ticker(bars));
        let sectors = sector_performance(&perf);
        (perf, sectors)
    }

    #[test]
    fn test_report_sections() {
        let (perf, sectors) = fixture();
        let report = build_report(&perf, &sectors);

        assert!(report.contains("FTSE 100 PERFORMANCE REPORT"));
        assert!(report.contains("BENCHMARK (FTSE 100 Index)"));
        assert!(report.contains("TOP 5 BY 1-YEAR RETURN"));
        assert!(report.contains("SECTOR RANKING"));
        assert!(report.contains("END OF REPORT"));
    }

    fn perf_entry(company: &str, sector: &str, return_1y: Option<f64>) -> TickerPerformance {
        TickerPerformance {
            ticker: company.to_string(),
            company: company.to_string(),
            sector: sector.to_string(),
            current_price: 100.0,
            return_1m: None,
            return_3m: None,
            return_6m: None,
            return_1y,
            return_total: 0.0,
            volatility: None,
            avg_volume: None,
            min_price: 90.0,
            max_price: 110.0,
            price_range_pct: 22.2,
        }
    }

    #[test]
    fn test_top_performers_chart_has_both_ends() {
        let perf: Vec<TickerPerformance> = (0..12)
            .map(|i| perf_entry(&format!("Co {i:02}"), "Energy", Some(12.0 - i as f64)))
            .chain(std::iter::once(perf_entry(
                "FTSE 100 Index",
                "Index",
                Some(5.0),
            )))
            .collect();
        let chart = chart_top_performers(&perf);

        assert_eq!(chart.series[0].name, "top_10");
        assert_eq!(chart.series[0].points.len(), 10);
        assert_eq!(chart.series[0].points[0].label, "Co 00");
        assert_eq!(chart.series[1].name, "bottom_10");
        // worst performer leads the bottom series
        assert_eq!(chart.series[1].points[0].label, "Co 11");
        for series in &chart.series {
            for point in &series.points {
                assert_ne!(point.label, "FTSE 100 Index");
            }
        }
    }

    #[test]
    fn test_correlation_chart_series_per_company() {
        let mut bars = bars_for(&FTSE_UNIVERSE[0], 60, 100.0);
        bars.extend(bars_for(&FTSE_UNIVERSE[2], 60, 400.0));
        let mut grouped = group_by_ticker(bars);
        for history in grouped.values_mut() {
            crate::stocks::metrics::enrich(history);
        }
        let chart = chart_correlation_matrix(&grouped);

        // upper triangle: the first company pairs with itself and the second
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].points.len(), 2);
        assert_eq!(chart.series[1].points.len(), 1);
    }

    #[test]
    fn test_monthly_returns_chart_caps_at_twelve_months() {
        // roughly fifteen months of daily history
        let bars = bars_for(&FTSE_UNIVERSE[0], 430, 100.0);
        let grouped = group_by_ticker(bars);
        let chart = chart_monthly_returns(&grouped);

        assert_eq!(chart.series.len(), 1);
        let months: std::collections::BTreeSet<&str> = chart.series[0]
            .points
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(months.len(), 12);
        assert!(months.contains("2024-03"));
        assert!(!months.contains("2023-01"));
    }

    #[test]
    fn test_run_requires_raw_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("fetch stage"));
    }
}
