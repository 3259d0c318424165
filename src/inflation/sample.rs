//! Deterministic sample datasets modeled on actual UK patterns.
//!
//! Used as the fallback (and as the only source of category/regional/wage
//! breakdowns) when the ONS downloads fail, so the cleaning stage always has
//! something to work with. Generation is seeded, so re-running produces
//! identical files.

use super::{BasketRow, GeneratedCpiRow, RegionalRow, WageRow};
use crate::output::write_csv;
use anyhow::Result;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::path::Path;
use tracing::info;

const SEED: u64 = 42;

/// UK regions with their relative price baselines (UK average = 100).
static REGIONS: &[(&str, f64, f64)] = &[
    ("London", 115.0, 145.0),
    ("South East", 106.0, 120.0),
    ("East of England", 103.0, 110.0),
    ("South West", 101.0, 105.0),
    ("West Midlands", 95.0, 90.0),
    ("East Midlands", 94.0, 88.0),
    ("Yorkshire and Humber", 93.0, 85.0),
    ("North West", 94.0, 87.0),
    ("North East", 91.0, 80.0),
    ("Wales", 92.0, 82.0),
    ("Scotland", 97.0, 90.0),
    ("Northern Ireland", 94.0, 85.0),
];

/// Tracked basket items with 2015 base price and category.
static BASKET_ITEMS: &[(&str, f64, &str)] = &[
    ("Bread (800g white loaf)", 1.10, "Food"),
    ("Milk (4 pints)", 1.35, "Food"),
    ("Eggs (12 large)", 2.20, "Food"),
    ("Butter (250g)", 1.80, "Food"),
    ("Cheese (500g cheddar)", 3.50, "Food"),
    ("Chicken breast (1kg)", 6.50, "Food"),
    ("Beef mince (500g)", 4.00, "Food"),
    ("Petrol (litre)", 1.15, "Transport"),
    ("Diesel (litre)", 1.18, "Transport"),
    ("Electricity (kWh)", 0.14, "Energy"),
    ("Gas (kWh)", 0.04, "Energy"),
    ("Cinema ticket", 10.50, "Recreation"),
    ("Pint of beer (pub)", 3.60, "Alcohol"),
    ("Coffee (cafe)", 2.80, "Restaurants"),
    ("Gym membership (monthly)", 35.00, "Recreation"),
];

struct Noise {
    rng: StdRng,
    unit: Normal<f64>,
}

impl Noise {
    fn new() -> Self {
        Self {
            rng: StdRng::seed_from_u64(SEED),
            unit: Normal::new(0.0, 1.0).expect("unit normal"),
        }
    }

    fn sample(&mut self, sd: f64) -> f64 {
        self.unit.sample(&mut self.rng) * sd
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Monthly dates from January 2015 through November 2024.
fn monthly_dates() -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for year in 2015..=2024 {
        for month in 1..=12u32 {
            if year == 2024 && month > 11 {
                break;
            }
            if let Some(d) = NaiveDate::from_ymd_opt(year, month, 1) {
                dates.push(d);
            }
        }
    }
    dates
}

/// Headline CPI trajectory following the actual UK path: low mid-2010s, the
/// COVID dip, the 2022 spike above 11%, and the 2023-24 decline.
fn base_cpi(year: i32, month: u32, noise: &mut Noise) -> f64 {
    let m = month as f64;
    let cpi = match year {
        ..=2016 => 0.5 + noise.sample(0.3),
        2017 => 2.5 + noise.sample(0.2),
        2018 => 2.3 + noise.sample(0.2),
        2019 => 1.8 + noise.sample(0.2),
        2020 => {
            if month <= 3 {
                1.7 + noise.sample(0.2)
            } else if month <= 8 {
                0.5 + noise.sample(0.3)
            } else {
                0.7 + noise.sample(0.2)
            }
        }
        2021 => 1.5 + (m / 12.0) * 3.5 + noise.sample(0.3),
        2022 => {
            if month <= 4 {
                6.0 + (m / 4.0) * 2.0 + noise.sample(0.3)
            } else if month <= 10 {
                9.0 + (m - 4.0) / 6.0 * 2.1 + noise.sample(0.3)
            } else {
                10.5 + noise.sample(0.2)
            }
        }
        2023 => 10.4 - (m / 12.0) * 6.5 + noise.sample(0.3),
        _ => 4.0 - (m / 12.0) * 1.5 + noise.sample(0.2),
    };
    cpi.max(-1.0)
}

pub fn generate_cpi_categories() -> Vec<GeneratedCpiRow> {
    let mut noise = Noise::new();
    let mut rows = Vec::new();

    for date in monthly_dates() {
        use chrono::Datelike;
        let (year, month) = (date.year(), date.month());
        let cpi = base_cpi(year, month, &mut noise);

        let food_mult = if year >= 2022 { 1.3 } else { 1.1 };
        let energy_mult = match year {
            2022 => 2.0,
            2023 => 1.5,
            _ => 1.0,
        };
        let transport_mult = if year == 2020 { 0.8 } else { 1.1 };

        rows.push(GeneratedCpiRow {
            date,
            year,
            month,
            month_name: date.format("%B").to_string(),
            cpi_annual: round1(cpi),
            cpih_annual: round1(cpi + 0.3 + noise.sample(0.1)),
            food_beverages: round1(cpi * food_mult + noise.sample(0.5)),
            alcohol_tobacco: round1(cpi * 0.9 + noise.sample(0.3)),
            clothing_footwear: round1(cpi * 0.5 + noise.sample(0.8)),
            housing_energy: round1(cpi * energy_mult + noise.sample(1.0)),
            furniture_household: round1(cpi * 0.9 + noise.sample(0.4)),
            health: round1(cpi * 0.7 + noise.sample(0.3)),
            transport: round1(cpi * transport_mult + noise.sample(0.6)),
            communication: round1(cpi * 0.4 + noise.sample(0.5)),
            recreation_culture: round1(cpi * 0.6 + noise.sample(0.4)),
            education: round1(cpi * 1.1 + noise.sample(0.3)),
            restaurants_hotels: round1(cpi * 1.2 + noise.sample(0.4)),
            miscellaneous: round1(cpi * 0.8 + noise.sample(0.3)),
        });
    }

    rows
}

pub fn generate_regional_prices() -> Vec<RegionalRow> {
    let mut noise = Noise::new();
    let mut rows = Vec::new();

    for year in 2015..2024 {
        for (region, base, housing) in REGIONS {
            let year_adj = (year - 2015) as f64 * 0.5;
            rows.push(RegionalRow {
                year,
                region: region.to_string(),
                overall_index: round1(base + year_adj + noise.sample(1.0)),
                housing_index: round1(housing + year_adj * 1.5 + noise.sample(2.0)),
                food_index: round1(100.0 + noise.sample(2.0)),
                transport_index: round1(100.0 + (base - 100.0) * 0.3 + noise.sample(2.0)),
                recreation_index: round1(100.0 + (base - 100.0) * 0.4 + noise.sample(2.0)),
            });
        }
    }

    rows
}

pub fn generate_wages() -> Vec<WageRow> {
    let mut noise = Noise::new();
    let mut rows = Vec::new();
    let base_wage = 480.0; // average weekly earnings, 2015

    for date in monthly_dates() {
        use chrono::Datelike;
        let (year, month) = (date.year(), date.month());

        let months_since_start = ((year - 2015) * 12) as f64 + month as f64;
        let wage_growth = months_since_start * 1.2; // roughly 2.5% annual
        let covid_adj = if year == 2020 && (4..=8).contains(&month) {
            -20.0
        } else {
            0.0
        };

        let avg = base_wage + wage_growth + covid_adj + noise.sample(5.0);

        rows.push(WageRow {
            date,
            year,
            month,
            avg_weekly_earnings: round2(avg),
            private_sector: round2(avg * 0.98 + noise.sample(5.0)),
            public_sector: round2(avg * 1.02 + noise.sample(4.0)),
            yoy_change: if year > 2015 {
                Some(round1(2.5 + noise.sample(0.5)))
            } else {
                None
            },
        });
    }

    rows
}

pub fn generate_basket() -> Vec<BasketRow> {
    let mut noise = Noise::new();
    let mut rows = Vec::new();

    for year in 2015..=2024 {
        for (item, base, category) in BASKET_ITEMS {
            let growth_mult = match (*category, year) {
                ("Energy", 2022) => 1.8,
                ("Energy", y) if y > 2022 => 1.5,
                ("Food", y) if y >= 2022 => 1.3,
                _ => 1.0,
            };

            let years_growth = (year - 2015) as f64 * 0.025 * growth_mult;
            let price = base * (1.0 + years_growth) + noise.sample(base * 0.02);

            rows.push(BasketRow {
                year,
                item: item.to_string(),
                category: category.to_string(),
                average_price: round2(price.max(base * 0.8)),
                unit: "GBP".to_string(),
            });
        }
    }

    rows
}

/// Generates all four sample datasets into `raw_dir`.
pub fn generate_all(raw_dir: &Path) -> Result<()> {
    let cpi = generate_cpi_categories();
    write_csv(&raw_dir.join("cpi_all_categories.csv"), &cpi)?;

    let regional = generate_regional_prices();
    write_csv(&raw_dir.join("regional_prices.csv"), &regional)?;

    let wages = generate_wages();
    write_csv(&raw_dir.join("wages_data.csv"), &wages)?;

    let basket = generate_basket();
    write_csv(&raw_dir.join("basket_of_goods.csv"), &basket)?;

    info!(
        cpi_rows = cpi.len(),
        regional_rows = regional.len(),
        wage_rows = wages.len(),
        basket_rows = basket.len(),
        "sample datasets generated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_cpi_categories();
        let b = generate_cpi_categories();
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].cpi_annual, b[0].cpi_annual);
        assert_eq!(a[50].housing_energy, b[50].housing_energy);
    }

    #[test]
    fn test_cpi_covers_jan_2015_to_nov_2024() {
        let rows = generate_cpi_categories();
        assert_eq!(rows.len(), 9 * 12 + 11);
        assert_eq!(rows.first().unwrap().year, 2015);
        let last = rows.last().unwrap();
        assert_eq!((last.year, last.month), (2024, 11));
    }

    #[test]
    fn test_cpi_floor_is_minus_one() {
        for row in generate_cpi_categories() {
            assert!(row.cpi_annual >= -1.0);
        }
    }

    #[test]
    fn test_2022_inflation_is_elevated() {
        let rows = generate_cpi_categories();
        let late_2022: Vec<_> = rows
            .iter()
            .filter(|r| r.year == 2022 && r.month >= 11)
            .collect();
        assert!(late_2022.iter().all(|r| r.cpi_annual > 8.0));
    }

    #[test]
    fn test_regional_covers_all_regions() {
        let rows = generate_regional_prices();
        assert_eq!(rows.len(), 9 * REGIONS.len());
        assert!(rows.iter().any(|r| r.region == "London"));
        // London is the most expensive region at baseline
        let london_2015: Vec<_> = rows
            .iter()
            .filter(|r| r.year == 2015 && r.region == "London")
            .collect();
        assert!(london_2015[0].overall_index > 105.0);
    }

    #[test]
    fn test_wages_yoy_missing_for_first_year() {
        let rows = generate_wages();
        assert!(rows.iter().filter(|r| r.year == 2015).all(|r| r.yoy_change.is_none()));
        assert!(rows.iter().filter(|r| r.year > 2015).all(|r| r.yoy_change.is_some()));
    }

    #[test]
    fn test_basket_prices_positive_and_bounded_below() {
        for row in generate_basket() {
            assert!(row.average_price > 0.0);
        }
    }

    #[test]
    fn test_generate_all_writes_four_files() {
        let dir = tempfile::tempdir().unwrap();
        generate_all(dir.path()).unwrap();
        for name in [
            "cpi_all_categories.csv",
            "regional_prices.csv",
            "wages_data.csv",
            "basket_of_goods.csv",
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }
}
