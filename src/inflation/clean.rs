//! Cleaning stage: ONS series merge, derived metrics, SQLite load.

use super::{BasketRow, CpiRow, GeneratedCpiRow, RegionalRow, WageRow};
use crate::db::Store;
use crate::output::{RunRecord, append_record, write_csv};
use crate::series::{Series, clean_ons_timeseries};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::params;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// ONS export files and the master-table column each one feeds.
static ONS_SERIES: &[(&str, &str)] = &[
    ("cpi_annual_rate.csv", "cpi_annual"),
    ("cpih_annual_rate.csv", "cpih_annual"),
    ("cpi_monthly_rate.csv", "cpi_monthly"),
    ("food_inflation.csv", "food_inflation"),
    ("housing_energy_inflation.csv", "housing_energy_inflation"),
];

/// Bank of England inflation target, percent.
pub const BOE_TARGET: f64 = 2.0;

/// Row counts loaded per table, for the run summary.
#[derive(Debug, Default)]
pub struct CleanSummary {
    pub master_rows: usize,
    pub regional_rows: usize,
    pub wage_rows: usize,
    pub basket_rows: usize,
}

/// Cleans every ONS export present in `raw_dir`. Missing files are skipped
/// with a warning; per-row drops are logged via the clean report.
pub fn process_ons_files(raw_dir: &Path) -> Vec<(String, Series)> {
    let mut cleaned = Vec::new();

    for (filename, column) in ONS_SERIES {
        let path = raw_dir.join(filename);
        if !path.exists() {
            warn!(file = filename, "ONS file not found, skipping");
            continue;
        }

        match clean_ons_timeseries(&path, column) {
            Ok((series, report)) => {
                if series.is_empty() {
                    warn!(file = filename, "no valid rows after cleaning");
                    continue;
                }
                info!(
                    file = filename,
                    kept = report.kept,
                    dropped = report.dropped_count(),
                    year_range = ?series.year_range(),
                    "series cleaned"
                );
                cleaned.push((column.to_string(), series));
            }
            Err(e) => warn!(file = filename, error = %e, "failed to clean, skipping"),
        }
    }

    cleaned
}

/// Builds the master CPI table. ONS CPI-annual is the base when available
/// (deepest history); other ONS series are left-joined on date, and category
/// breakdowns come from the generated dataset. Falls back entirely to the
/// generated dataset when no ONS base exists.
pub fn build_master(ons: &[(String, Series)], generated: &[GeneratedCpiRow]) -> Vec<CpiRow> {
    let base = ons.iter().find(|(name, _)| name == "cpi_annual");

    let mut table: BTreeMap<NaiveDate, CpiRow> = BTreeMap::new();

    match base {
        Some((_, series)) => {
            for point in &series.points {
                let mut row = CpiRow::empty(point.date);
                row.cpi_annual = Some(point.value);
                table.insert(point.date, row);
            }

            // Left-join the remaining series: only dates already in the base.
            for (name, series) in ons {
                if name == "cpi_annual" {
                    continue;
                }
                for point in &series.points {
                    if let Some(row) = table.get_mut(&point.date) {
                        match name.as_str() {
                            "cpih_annual" => row.cpih_annual = Some(point.value),
                            "cpi_monthly" => row.cpi_monthly = Some(point.value),
                            "food_inflation" => row.food_inflation = Some(point.value),
                            "housing_energy_inflation" => {
                                row.housing_energy_inflation = Some(point.value)
                            }
                            _ => {}
                        }
                    }
                }
            }

            for r#gen in generated {
                if let Some(row) = table.get_mut(&r#gen.date) {
                    merge_categories(row, r#gen);
                }
            }
        }
        None => {
            info!("no ONS CPI annual series; using generated data as master");
            for r#gen in generated {
                let mut row = CpiRow::empty(r#gen.date);
                row.cpi_annual = Some(r#gen.cpi_annual);
                row.cpih_annual = Some(r#gen.cpih_annual);
                merge_categories(&mut row, r#gen);
                table.insert(r#gen.date, row);
            }
        }
    }

    let mut rows: Vec<CpiRow> = table.into_values().collect();
    derive_metrics(&mut rows);
    rows
}

fn merge_categories(row: &mut CpiRow, r#gen: &GeneratedCpiRow) {
    row.food_beverages = Some(r#gen.food_beverages);
    row.alcohol_tobacco = Some(r#gen.alcohol_tobacco);
    row.clothing_footwear = Some(r#gen.clothing_footwear);
    row.housing_energy = Some(r#gen.housing_energy);
    row.furniture_household = Some(r#gen.furniture_household);
    row.health = Some(r#gen.health);
    row.transport = Some(r#gen.transport);
    row.communication = Some(r#gen.communication);
    row.recreation_culture = Some(r#gen.recreation_culture);
    row.education = Some(r#gen.education);
    row.restaurants_hotels = Some(r#gen.restaurants_hotels);
    row.miscellaneous = Some(r#gen.miscellaneous);
}

/// Derived metrics over a date-sorted master table: 12-month change,
/// cumulative inflation, target comparison, regime classification.
pub fn derive_metrics(rows: &mut [CpiRow]) {
    let annual: Vec<Option<f64>> = rows.iter().map(|r| r.cpi_annual).collect();
    let mut cumulative = 1.0;

    for (i, row) in rows.iter_mut().enumerate() {
        let Some(rate) = annual[i] else { continue };

        if i >= 12 {
            if let Some(prev) = annual[i - 12] {
                row.cpi_yoy_change = Some(rate - prev);
            }
        }

        // compounding of the annualized rate spread over months
        cumulative *= 1.0 + rate / 100.0 / 12.0;
        row.cumulative_inflation = Some((cumulative - 1.0) * 100.0);

        row.above_target = Some(rate > BOE_TARGET);
        row.deviation_from_target = Some(rate - BOE_TARGET);
        row.inflation_regime = Some(classify_inflation(rate).to_string());
    }
}

/// Classifies an annual CPI rate into the reporting regime bands.
pub fn classify_inflation(rate: f64) -> &'static str {
    if rate < 0.0 {
        "Deflation"
    } else if rate < 1.0 {
        "Very Low"
    } else if rate < 2.0 {
        "Below Target"
    } else if rate < 3.0 {
        "On Target"
    } else if rate < 5.0 {
        "Elevated"
    } else if rate < 10.0 {
        "High"
    } else {
        "Very High"
    }
}

/// Loads a generated CSV dataset, or `None` with a warning when absent.
fn load_generated<T: DeserializeOwned>(path: &Path) -> Option<Vec<T>> {
    if !path.exists() {
        warn!(file = %path.display(), "generated dataset not found");
        return None;
    }

    match csv::Reader::from_path(path) {
        Ok(mut reader) => {
            let rows: Result<Vec<T>, _> = reader.deserialize().collect();
            match rows {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "failed to parse generated dataset");
                    None
                }
            }
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "failed to open generated dataset");
            None
        }
    }
}

/// Writes all four tables into the cost-of-living database with indexes.
pub fn save_to_store(
    store: &Store,
    master: &[CpiRow],
    regional: &[RegionalRow],
    wages: &[WageRow],
    basket: &[BasketRow],
) -> Result<()> {
    store.recreate_table(
        "cpi_data",
        "date TEXT NOT NULL, year INTEGER NOT NULL, month INTEGER NOT NULL, \
         month_name TEXT NOT NULL, cpi_annual REAL, cpih_annual REAL, cpi_monthly REAL, \
         food_inflation REAL, housing_energy_inflation REAL, food_beverages REAL, \
         alcohol_tobacco REAL, clothing_footwear REAL, housing_energy REAL, \
         furniture_household REAL, health REAL, transport REAL, communication REAL, \
         recreation_culture REAL, education REAL, restaurants_hotels REAL, \
         miscellaneous REAL, cpi_yoy_change REAL, cumulative_inflation REAL, \
         above_target INTEGER, deviation_from_target REAL, inflation_regime TEXT",
    )?;

    {
        let tx = store.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cpi_data VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,\
                 ?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26)",
            )?;
            for r in master {
                stmt.execute(params![
                    r.date.format("%Y-%m-%d").to_string(),
                    r.year,
                    r.month,
                    r.month_name,
                    r.cpi_annual,
                    r.cpih_annual,
                    r.cpi_monthly,
                    r.food_inflation,
                    r.housing_energy_inflation,
                    r.food_beverages,
                    r.alcohol_tobacco,
                    r.clothing_footwear,
                    r.housing_energy,
                    r.furniture_household,
                    r.health,
                    r.transport,
                    r.communication,
                    r.recreation_culture,
                    r.education,
                    r.restaurants_hotels,
                    r.miscellaneous,
                    r.cpi_yoy_change,
                    r.cumulative_inflation,
                    r.above_target,
                    r.deviation_from_target,
                    r.inflation_regime,
                ])?;
            }
        }
        tx.commit()?;
    }

    store.recreate_table(
        "regional_prices",
        "year INTEGER NOT NULL, region TEXT NOT NULL, overall_index REAL NOT NULL, \
         housing_index REAL NOT NULL, food_index REAL NOT NULL, \
         transport_index REAL NOT NULL, recreation_index REAL NOT NULL",
    )?;
    {
        let tx = store.conn().unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO regional_prices VALUES (?1,?2,?3,?4,?5,?6,?7)")?;
            for r in regional {
                stmt.execute(params![
                    r.year,
                    r.region,
                    r.overall_index,
                    r.housing_index,
                    r.food_index,
                    r.transport_index,
                    r.recreation_index,
                ])?;
            }
        }
        tx.commit()?;
    }

    store.recreate_table(
        "wages",
        "date TEXT NOT NULL, year INTEGER NOT NULL, month INTEGER NOT NULL, \
         avg_weekly_earnings REAL NOT NULL, private_sector REAL NOT NULL, \
         public_sector REAL NOT NULL, yoy_change REAL",
    )?;
    {
        let tx = store.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO wages VALUES (?1,?2,?3,?4,?5,?6,?7)")?;
            for r in wages {
                stmt.execute(params![
                    r.date.format("%Y-%m-%d").to_string(),
                    r.year,
                    r.month,
                    r.avg_weekly_earnings,
                    r.private_sector,
                    r.public_sector,
                    r.yoy_change,
                ])?;
            }
        }
        tx.commit()?;
    }

    store.recreate_table(
        "basket_of_goods",
        "year INTEGER NOT NULL, item TEXT NOT NULL, category TEXT NOT NULL, \
         average_price REAL NOT NULL, unit TEXT NOT NULL",
    )?;
    {
        let tx = store.conn().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO basket_of_goods VALUES (?1,?2,?3,?4,?5)")?;
            for r in basket {
                stmt.execute(params![r.year, r.item, r.category, r.average_price, r.unit])?;
            }
        }
        tx.commit()?;
    }

    store.create_index("idx_cpi_date", "cpi_data", "date")?;
    store.create_index("idx_cpi_year", "cpi_data", "year")?;
    store.create_index("idx_regional_year", "regional_prices", "year")?;
    store.create_index("idx_regional_region", "regional_prices", "region")?;
    store.create_index("idx_wages_date", "wages", "date")?;
    store.create_index("idx_basket_year", "basket_of_goods", "year")?;

    Ok(())
}

/// Runs the full cleaning stage against `data_dir`.
pub fn run(data_dir: &Path) -> Result<CleanSummary> {
    let raw_dir = data_dir.join("raw");
    let processed_dir = data_dir.join("processed");
    std::fs::create_dir_all(&processed_dir)?;

    let ons = process_ons_files(&raw_dir);

    let generated: Vec<GeneratedCpiRow> =
        load_generated(&raw_dir.join("cpi_all_categories.csv")).unwrap_or_default();
    let regional: Vec<RegionalRow> =
        load_generated(&raw_dir.join("regional_prices.csv")).unwrap_or_default();
    let wages: Vec<WageRow> =
        load_generated(&raw_dir.join("wages_data.csv")).unwrap_or_default();
    let basket: Vec<BasketRow> =
        load_generated(&raw_dir.join("basket_of_goods.csv")).unwrap_or_default();

    let master = build_master(&ons, &generated);
    anyhow::ensure!(
        !master.is_empty(),
        "no CPI data available: run the fetch stage first"
    );

    let store = Store::open(&data_dir.join("cost_of_living.db"))
        .context("opening cost of living database")?;
    save_to_store(&store, &master, &regional, &wages, &basket)?;
    let db_rows = store.count("cpi_data")?;
    store.close()?;

    write_csv(&processed_dir.join("master_cpi_data.csv"), &master)?;
    if !regional.is_empty() {
        write_csv(&processed_dir.join("regional_prices_clean.csv"), &regional)?;
    }
    if !wages.is_empty() {
        write_csv(&processed_dir.join("wages_clean.csv"), &wages)?;
    }

    let summary = CleanSummary {
        master_rows: master.len(),
        regional_rows: regional.len(),
        wage_rows: wages.len(),
        basket_rows: basket.len(),
    };
    info!(
        master_rows = summary.master_rows,
        db_rows,
        regional_rows = summary.regional_rows,
        wage_rows = summary.wage_rows,
        basket_rows = summary.basket_rows,
        "cleaning complete"
    );

    append_record(
        &data_dir.join("run_history.csv"),
        &RunRecord::new("clean-inflation", summary.master_rows),
    )?;
    Ok(summary)
}
