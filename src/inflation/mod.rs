//! UK cost-of-living pipeline: ONS inflation series, regional price indexes,
//! wages, and a basket of tracked goods.

pub mod clean;
pub mod fetch;
pub mod report;
pub mod sample;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One month of the master CPI table. ONS series provide the headline rates;
/// the generated dataset fills in the twelve COICOP category breakdowns for
/// recent years. Derived metrics are populated by [`clean::derive_metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpiRow {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub month_name: String,

    pub cpi_annual: Option<f64>,
    pub cpih_annual: Option<f64>,
    pub cpi_monthly: Option<f64>,
    pub food_inflation: Option<f64>,
    pub housing_energy_inflation: Option<f64>,

    // category breakdowns
    pub food_beverages: Option<f64>,
    pub alcohol_tobacco: Option<f64>,
    pub clothing_footwear: Option<f64>,
    pub housing_energy: Option<f64>,
    pub furniture_household: Option<f64>,
    pub health: Option<f64>,
    pub transport: Option<f64>,
    pub communication: Option<f64>,
    pub recreation_culture: Option<f64>,
    pub education: Option<f64>,
    pub restaurants_hotels: Option<f64>,
    pub miscellaneous: Option<f64>,

    // derived
    pub cpi_yoy_change: Option<f64>,
    pub cumulative_inflation: Option<f64>,
    pub above_target: Option<bool>,
    pub deviation_from_target: Option<f64>,
    pub inflation_regime: Option<String>,
}

impl CpiRow {
    /// A row with only the date columns filled in.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            year: date.year(),
            month: date.month(),
            month_name: date.format("%B").to_string(),
            cpi_annual: None,
            cpih_annual: None,
            cpi_monthly: None,
            food_inflation: None,
            housing_energy_inflation: None,
            food_beverages: None,
            alcohol_tobacco: None,
            clothing_footwear: None,
            housing_energy: None,
            furniture_household: None,
            health: None,
            transport: None,
            communication: None,
            recreation_culture: None,
            education: None,
            restaurants_hotels: None,
            miscellaneous: None,
            cpi_yoy_change: None,
            cumulative_inflation: None,
            above_target: None,
            deviation_from_target: None,
            inflation_regime: None,
        }
    }
}

/// One month of the generated CPI-by-category sample dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCpiRow {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub cpi_annual: f64,
    pub cpih_annual: f64,
    pub food_beverages: f64,
    pub alcohol_tobacco: f64,
    pub clothing_footwear: f64,
    pub housing_energy: f64,
    pub furniture_household: f64,
    pub health: f64,
    pub transport: f64,
    pub communication: f64,
    pub recreation_culture: f64,
    pub education: f64,
    pub restaurants_hotels: f64,
    pub miscellaneous: f64,
}

/// One region-year of relative price indexes (UK average = 100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalRow {
    pub year: i32,
    pub region: String,
    pub overall_index: f64,
    pub housing_index: f64,
    pub food_index: f64,
    pub transport_index: f64,
    pub recreation_index: f64,
}

/// One month of average weekly earnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WageRow {
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub avg_weekly_earnings: f64,
    pub private_sector: f64,
    pub public_sector: f64,
    pub yoy_change: Option<f64>,
}

/// One item-year of the tracked basket of goods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketRow {
    pub year: i32,
    pub item: String,
    pub category: String,
    pub average_price: f64,
    pub unit: String,
}
