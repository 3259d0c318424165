//! Record types and reference data for the Price Paid pipeline.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One row of a yearly Price Paid file. The source CSV is headerless; this
/// struct fixes the 16-column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction_id: String,
    pub price: Option<f64>,
    pub date_of_transfer: Option<String>,
    pub postcode: Option<String>,
    pub property_type: String,
    pub old_new: String,
    pub duration: String,
    pub paon: Option<String>,
    pub saon: Option<String>,
    pub street: Option<String>,
    pub locality: Option<String>,
    pub town_city: Option<String>,
    pub district: Option<String>,
    pub county: Option<String>,
    pub ppd_category: String,
    pub record_status: String,
}

/// A cleaned London transaction with derived columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub price: f64,
    pub date_of_transfer: NaiveDate,
    pub postcode: String,
    pub property_type: String,
    pub property_type_name: String,
    pub old_new: String,
    pub duration: String,
    pub district: String,
    pub region: String,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    pub year_month: String,
    pub postcode_district: Option<String>,
    pub price_band: String,
}

impl Transaction {
    pub fn derive(
        raw: &RawTransaction,
        price: f64,
        date: NaiveDate,
        postcode: String,
        district: String,
    ) -> Self {
        let region = region_for(&district).unwrap_or("Unknown").to_string();
        Self {
            transaction_id: raw.transaction_id.clone(),
            price,
            property_type_name: property_type_name(&raw.property_type).to_string(),
            property_type: raw.property_type.clone(),
            old_new: raw.old_new.clone(),
            duration: raw.duration.clone(),
            region,
            year: date.year(),
            month: date.month(),
            quarter: (date.month() - 1) / 3 + 1,
            year_month: date.format("%Y-%m").to_string(),
            postcode_district: postcode_district(&postcode),
            price_band: price_band(price).to_string(),
            postcode,
            district,
            date_of_transfer: date,
        }
    }
}

/// Single-letter Price Paid property codes mapped to display names.
pub fn property_type_name(code: &str) -> &'static str {
    match code {
        "D" => "Detached",
        "S" => "Semi-Detached",
        "T" => "Terraced",
        "F" => "Flat/Maisonette",
        _ => "Other",
    }
}

/// The 33 London districts and their region.
pub static LONDON_REGIONS: &[(&str, &str)] = &[
    ("CITY OF LONDON", "Central"),
    ("WESTMINSTER", "Central"),
    ("CAMDEN", "Central"),
    ("ISLINGTON", "Central"),
    ("KENSINGTON AND CHELSEA", "Central"),
    ("LAMBETH", "Central"),
    ("SOUTHWARK", "Central"),
    ("TOWER HAMLETS", "Central"),
    ("BARNET", "North"),
    ("ENFIELD", "North"),
    ("HARINGEY", "North"),
    ("WALTHAM FOREST", "North"),
    ("BROMLEY", "South"),
    ("CROYDON", "South"),
    ("LEWISHAM", "South"),
    ("MERTON", "South"),
    ("SUTTON", "South"),
    ("GREENWICH", "South"),
    ("BARKING AND DAGENHAM", "East"),
    ("BEXLEY", "East"),
    ("HAVERING", "East"),
    ("NEWHAM", "East"),
    ("REDBRIDGE", "East"),
    ("HACKNEY", "East"),
    ("BRENT", "West"),
    ("EALING", "West"),
    ("HAMMERSMITH AND FULHAM", "West"),
    ("HARROW", "West"),
    ("HILLINGDON", "West"),
    ("HOUNSLOW", "West"),
    ("RICHMOND UPON THAMES", "West"),
    ("KINGSTON UPON THAMES", "West"),
    ("WANDSWORTH", "West"),
];

pub fn is_london_district(district: &str) -> bool {
    let upper = district.trim().to_uppercase();
    LONDON_REGIONS.iter().any(|(d, _)| *d == upper)
}

pub fn region_for(district: &str) -> Option<&'static str> {
    let upper = district.trim().to_uppercase();
    LONDON_REGIONS
        .iter()
        .find(|(d, _)| *d == upper)
        .map(|(_, r)| *r)
}

/// Buckets a sale price into the band labels used throughout the reports.
pub fn price_band(price: f64) -> &'static str {
    if price < 250_000.0 {
        "Under £250k"
    } else if price < 500_000.0 {
        "£250k-£500k"
    } else if price < 750_000.0 {
        "£500k-£750k"
    } else if price < 1_000_000.0 {
        "£750k-£1M"
    } else if price < 2_000_000.0 {
        "£1M-£2M"
    } else {
        "Over £2M"
    }
}

/// Extracts the outward district from a full postcode, e.g. "SW1A" from
/// "SW1A 1AA": one or two letters, one or two digits, optional trailing
/// letter.
pub fn postcode_district(postcode: &str) -> Option<String> {
    let s = postcode.trim().to_uppercase();
    let chars: Vec<char> = s.chars().collect();

    let alpha = chars.iter().take_while(|c| c.is_ascii_alphabetic()).count();
    if alpha == 0 || alpha > 2 {
        return None;
    }
    let digits = chars[alpha..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 || digits > 2 {
        return None;
    }
    let mut end = alpha + digits;
    if chars.get(end).is_some_and(|c| c.is_ascii_alphabetic()) {
        end += 1;
    }
    // Whatever follows must be the inward part, separated by a space.
    if chars.get(end).is_some_and(|c| !c.is_whitespace()) {
        return None;
    }
    Some(chars[..end].iter().collect())
}
