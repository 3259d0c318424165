//! Analysis stage: plain-text report and chart-data artifacts for the
//! cost-of-living pipeline.

use super::{BasketRow, CpiRow, RegionalRow, WageRow};
use crate::charts::{ChartData, ChartPoint, ChartSeries, single_series};
use crate::output::{write_json, write_report};
use crate::util::mean;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

fn load_csv<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let rows: Result<Vec<T>, _> = reader.deserialize().collect();
    Ok(rows?)
}

fn load_csv_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        return Vec::new();
    }
    load_csv(path).unwrap_or_default()
}

/// Timeline of the headline CPI annual rate.
pub fn chart_inflation_timeline(master: &[CpiRow]) -> ChartData {
    let points = master
        .iter()
        .filter_map(|r| {
            r.cpi_annual.map(|v| ChartPoint {
                label: r.date.format("%Y-%m").to_string(),
                value: v,
            })
        })
        .collect();
    single_series("UK inflation timeline (CPI annual rate)", "cpi_annual", points)
}

/// The last 24 months of CPI and CPIH.
pub fn chart_recent_trend(master: &[CpiRow]) -> ChartData {
    let window = master.len().saturating_sub(24);
    let recent = &master[window..];

    let series = |name: &str, get: fn(&CpiRow) -> Option<f64>| ChartSeries {
        name: name.to_string(),
        points: recent
            .iter()
            .filter_map(|r| {
                get(r).map(|v| ChartPoint {
                    label: r.date.format("%Y-%m").to_string(),
                    value: v,
                })
            })
            .collect(),
    };

    ChartData::new(
        "Recent inflation trend (24 months)",
        vec![
            series("cpi_annual", |r| r.cpi_annual),
            series("cpih_annual", |r| r.cpih_annual),
        ],
    )
}

/// Latest-month inflation rate per COICOP category.
pub fn chart_category_comparison(master: &[CpiRow]) -> Option<ChartData> {
    let latest = master.iter().rev().find(|r| r.food_beverages.is_some())?;

    let categories: [(&str, Option<f64>); 12] = [
        ("Food & Beverages", latest.food_beverages),
        ("Alcohol & Tobacco", latest.alcohol_tobacco),
        ("Clothing & Footwear", latest.clothing_footwear),
        ("Housing & Energy", latest.housing_energy),
        ("Furniture & Household", latest.furniture_household),
        ("Health", latest.health),
        ("Transport", latest.transport),
        ("Communication", latest.communication),
        ("Recreation & Culture", latest.recreation_culture),
        ("Education", latest.education),
        ("Restaurants & Hotels", latest.restaurants_hotels),
        ("Miscellaneous", latest.miscellaneous),
    ];

    let points = categories
        .iter()
        .filter_map(|(name, v)| {
            v.map(|value| ChartPoint {
                label: name.to_string(),
                value,
            })
        })
        .collect();

    Some(single_series(
        &format!("Inflation by category ({})", latest.date.format("%B %Y")),
        "category_rate",
        points,
    ))
}

/// Latest-year overall price index per region.
pub fn chart_regional_prices(regional: &[RegionalRow]) -> Option<ChartData> {
    let latest_year = regional.iter().map(|r| r.year).max()?;
    let mut points: Vec<ChartPoint> = regional
        .iter()
        .filter(|r| r.year == latest_year)
        .map(|r| ChartPoint {
            label: r.region.clone(),
            value: r.overall_index,
        })
        .collect();
    points.sort_by(|a, b| b.value.total_cmp(&a.value));

    Some(single_series(
        &format!("Regional price levels ({latest_year}, UK = 100)"),
        "overall_index",
        points,
    ))
}

/// Latest-year housing cost index per region.
pub fn chart_housing_costs(regional: &[RegionalRow]) -> Option<ChartData> {
    let latest_year = regional.iter().map(|r| r.year).max()?;
    let mut points: Vec<ChartPoint> = regional
        .iter()
        .filter(|r| r.year == latest_year)
        .map(|r| ChartPoint {
            label: r.region.clone(),
            value: r.housing_index,
        })
        .collect();
    points.sort_by(|a, b| b.value.total_cmp(&a.value));

    Some(single_series(
        &format!("Regional housing costs ({latest_year}, UK = 100)"),
        "housing_index",
        points,
    ))
}

/// First year of the month-by-year inflation grid.
const HEATMAP_FROM_YEAR: i32 = 2015;

/// Month-by-year grid of the CPI annual rate, one series per year.
pub fn chart_inflation_heatmap(master: &[CpiRow]) -> ChartData {
    let mut series: Vec<ChartSeries> = Vec::new();
    for row in master {
        if row.year < HEATMAP_FROM_YEAR {
            continue;
        }
        let Some(rate) = row.cpi_annual else {
            continue;
        };
        let point = ChartPoint {
            label: row.date.format("%b").to_string(),
            value: rate,
        };
        let name = row.year.to_string();
        match series.iter_mut().find(|s| s.name == name) {
            Some(s) => s.points.push(point),
            None => series.push(ChartSeries {
                name,
                points: vec![point],
            }),
        }
    }
    ChartData::new("Inflation by month and year", series)
}

/// Wage growth against CPI, month by month.
pub fn chart_wages_vs_inflation(master: &[CpiRow], wages: &[WageRow]) -> ChartData {
    let wage_points = wages
        .iter()
        .filter_map(|w| {
            w.yoy_change.map(|v| ChartPoint {
                label: w.date.format("%Y-%m").to_string(),
                value: v,
            })
        })
        .collect();
    let cpi_points = master
        .iter()
        .filter_map(|r| {
            r.cpi_annual.map(|v| ChartPoint {
                label: r.date.format("%Y-%m").to_string(),
                value: v,
            })
        })
        .collect();

    ChartData::new(
        "Wage growth vs inflation",
        vec![
            ChartSeries {
                name: "wage_yoy".to_string(),
                points: wage_points,
            },
            ChartSeries {
                name: "cpi_annual".to_string(),
                points: cpi_points,
            },
        ],
    )
}

/// Price change per basket item between the first and latest tracked year.
pub fn chart_basket_comparison(basket: &[BasketRow]) -> Option<ChartData> {
    let first_year = basket.iter().map(|r| r.year).min()?;
    let last_year = basket.iter().map(|r| r.year).max()?;

    let price_in = |item: &str, year: i32| {
        basket
            .iter()
            .find(|r| r.item == item && r.year == year)
            .map(|r| r.average_price)
    };

    let mut items: Vec<&str> = basket
        .iter()
        .filter(|r| r.year == first_year)
        .map(|r| r.item.as_str())
        .collect();
    items.dedup();

    let points: Vec<ChartPoint> = items
        .iter()
        .filter_map(|item| {
            let before = price_in(item, first_year)?;
            let after = price_in(item, last_year)?;
            if before <= 0.0 {
                return None;
            }
            Some(ChartPoint {
                label: item.to_string(),
                value: (after / before - 1.0) * 100.0,
            })
        })
        .collect();

    Some(single_series(
        &format!("Basket price change {first_year}-{last_year} (%)"),
        "price_change_pct",
        points,
    ))
}

/// Builds the plain-text analysis report.
pub fn build_report(master: &[CpiRow], regional: &[RegionalRow]) -> String {
    let mut out = String::new();
    let bar = "=".repeat(60);
    let rule = "-".repeat(40);

    let _ = writeln!(out, "{bar}");
    let _ = writeln!(out, "UK COST OF LIVING ANALYSIS REPORT");
    let _ = writeln!(out, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{bar}");

    if let Some(latest) = master.iter().rev().find(|r| r.cpi_annual.is_some()) {
        let rate = latest.cpi_annual.unwrap_or_default();
        let _ = writeln!(
            out,
            "\nCURRENT STATE (as of {})",
            latest.date.format("%B %Y")
        );
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "CPI Annual Rate: {rate:.1}%");
        if let Some(cpih) = latest.cpih_annual {
            let _ = writeln!(out, "CPIH Annual Rate: {cpih:.1}%");
        }
        if let Some(regime) = &latest.inflation_regime {
            let _ = writeln!(out, "Inflation Regime: {regime}");
        }
        let _ = writeln!(
            out,
            "Distance from BOE Target: {:+.1}pp",
            rate - super::clean::BOE_TARGET
        );

        // Latest-year summary
        let year = latest.year;
        let ytd: Vec<f64> = master
            .iter()
            .filter(|r| r.year == year)
            .filter_map(|r| r.cpi_annual)
            .collect();
        if !ytd.is_empty() {
            let _ = writeln!(out, "\n{year} YEAR-TO-DATE");
            let _ = writeln!(out, "{rule}");
            let _ = writeln!(out, "Average CPI: {:.1}%", mean(&ytd));
            let _ = writeln!(
                out,
                "Peak: {:.1}%",
                ytd.iter().cloned().fold(f64::MIN, f64::max)
            );
            let _ = writeln!(
                out,
                "Low: {:.1}%",
                ytd.iter().cloned().fold(f64::MAX, f64::min)
            );
        }
    }

    if let Some(peak) = master
        .iter()
        .filter(|r| r.cpi_annual.is_some())
        .max_by(|a, b| {
            a.cpi_annual
                .unwrap_or(f64::MIN)
                .total_cmp(&b.cpi_annual.unwrap_or(f64::MIN))
        })
    {
        let _ = writeln!(out, "\nHISTORICAL PEAK");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Peak CPI: {:.1}%", peak.cpi_annual.unwrap_or_default());
        let _ = writeln!(out, "Date: {}", peak.date.format("%B %Y"));
    }

    if let Some(latest_year) = regional.iter().map(|r| r.year).max() {
        let latest: Vec<&RegionalRow> =
            regional.iter().filter(|r| r.year == latest_year).collect();
        let most_exp = latest.iter().max_by(|a, b| {
            a.overall_index.total_cmp(&b.overall_index)
        });
        let cheapest = latest.iter().min_by(|a, b| {
            a.overall_index.total_cmp(&b.overall_index)
        });

        if let (Some(most_exp), Some(cheapest)) = (most_exp, cheapest) {
            let _ = writeln!(out, "\nREGIONAL SUMMARY ({latest_year})");
            let _ = writeln!(out, "{rule}");
            let _ = writeln!(
                out,
                "Most Expensive: {} (Index: {:.0})",
                most_exp.region, most_exp.overall_index
            );
            let _ = writeln!(
                out,
                "Most Affordable: {} (Index: {:.0})",
                cheapest.region, cheapest.overall_index
            );
            let _ = writeln!(
                out,
                "Premium over UK average: {:.0}%",
                most_exp.overall_index - 100.0
            );
        }
    }

    let _ = writeln!(out, "\n{bar}");
    let _ = writeln!(out, "END OF REPORT");
    let _ = writeln!(out, "{bar}");

    out
}

/// Runs the report stage: loads the processed tables, writes the report and
/// all chart-data artifacts under `out_dir`.
pub fn run(data_dir: &Path, out_dir: &Path) -> Result<()> {
    let processed = data_dir.join("processed");
    let master_path = processed.join("master_cpi_data.csv");
    if !master_path.exists() {
        bail!(
            "{} not found: run the cleaning stage first",
            master_path.display()
        );
    }

    let master: Vec<CpiRow> = load_csv(&master_path)?;
    let regional: Vec<RegionalRow> = load_csv_optional(&processed.join("regional_prices_clean.csv"));
    let wages: Vec<WageRow> = load_csv_optional(&processed.join("wages_clean.csv"));
    let basket: Vec<BasketRow> = load_csv_optional(&data_dir.join("raw/basket_of_goods.csv"));

    let charts_dir = out_dir.join("charts");
    write_json(
        &charts_dir.join("inflation_timeline.json"),
        &chart_inflation_timeline(&master),
    )?;
    write_json(
        &charts_dir.join("recent_trend.json"),
        &chart_recent_trend(&master),
    )?;
    if let Some(chart) = chart_category_comparison(&master) {
        write_json(&charts_dir.join("category_comparison.json"), &chart)?;
    }
    if let Some(chart) = chart_regional_prices(&regional) {
        write_json(&charts_dir.join("regional_prices.json"), &chart)?;
    }
    if let Some(chart) = chart_housing_costs(&regional) {
        write_json(&charts_dir.join("housing_costs.json"), &chart)?;
    }
    write_json(
        &charts_dir.join("inflation_heatmap.json"),
        &chart_inflation_heatmap(&master),
    )?;
    if !wages.is_empty() {
        write_json(
            &charts_dir.join("wages_vs_inflation.json"),
            &chart_wages_vs_inflation(&master, &wages),
        )?;
    }
    if let Some(chart) = chart_basket_comparison(&basket) {
        write_json(&charts_dir.join("basket_comparison.json"), &chart)?;
    }

    let report = build_report(&master, &regional);
    write_report(&out_dir.join("reports/analysis_report.txt"), &report)?;

    info!(rows = master.len(), "cost-of-living report generated");
    Ok(())
}
