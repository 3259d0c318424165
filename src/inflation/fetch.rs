//! Download stage for the cost-of-living pipeline.
//!
//! ONS series come from the stable generator links. A failed download is
//! logged and skipped; the generated sample datasets are always written so
//! the cleaning stage can fall back to them.

use crate::fetch::{HttpClient, download_to_file};
use crate::inflation::sample;
use anyhow::Result;
use std::path::Path;
use tracing::{error, info};

pub struct OnsDataset {
    pub url: &'static str,
    pub filename: &'static str,
    pub description: &'static str,
}

/// Direct ONS generator download links. These URIs are stable series IDs.
pub static ONS_DATASETS: &[OnsDataset] = &[
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/economy/inflationandpriceindices/timeseries/d7g7/mm23",
        filename: "cpi_annual_rate.csv",
        description: "CPI Annual Rate",
    },
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/economy/inflationandpriceindices/timeseries/l55o/mm23",
        filename: "cpih_annual_rate.csv",
        description: "CPIH Annual Rate",
    },
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/economy/inflationandpriceindices/timeseries/d7g8/mm23",
        filename: "cpi_monthly_rate.csv",
        description: "CPI Monthly Rate",
    },
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/economy/inflationandpriceindices/timeseries/l59c/mm23",
        filename: "food_inflation.csv",
        description: "Food & Beverages Inflation",
    },
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/economy/inflationandpriceindices/timeseries/l59h/mm23",
        filename: "housing_energy_inflation.csv",
        description: "Housing & Energy Inflation",
    },
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/economy/inflationandpriceindices/timeseries/l59m/mm23",
        filename: "transport_inflation.csv",
        description: "Transport Inflation",
    },
    OnsDataset {
        url: "https://www.ons.gov.uk/generator?format=csv&uri=/employmentandlabourmarket/peopleinwork/earningsandworkinghours/timeseries/kab9/lms",
        filename: "avg_weekly_earnings.csv",
        description: "Average Weekly Earnings",
    },
];

/// Downloads all ONS datasets into `raw_dir`, returning the success count.
/// Failures are logged and skipped so one dead link never stops the batch.
pub async fn download_ons_datasets<C: HttpClient>(client: &C, raw_dir: &Path) -> usize {
    let mut success = 0;

    for ds in ONS_DATASETS {
        match download_to_file(client, ds.url, raw_dir, ds.filename).await {
            Ok(_) => {
                info!(dataset = ds.description, "downloaded");
                success += 1;
            }
            Err(e) => {
                error!(dataset = ds.description, error = %e, "download failed, skipping");
            }
        }
    }

    info!(
        downloaded = success,
        total = ONS_DATASETS.len(),
        "ONS downloads finished"
    );
    success
}

/// Runs the full fetch stage: ONS downloads plus sample generation.
pub async fn run<C: HttpClient>(client: &C, data_dir: &Path) -> Result<()> {
    let raw_dir = data_dir.join("raw");
    std::fs::create_dir_all(&raw_dir)?;

    let downloaded = download_ons_datasets(client, &raw_dir).await;
    if downloaded == 0 {
        info!("no ONS files downloaded; cleaning will rely on generated data");
    }

    // Always generated, as backup and as the only source of category,
    // regional, wage, and basket breakdowns.
    sample::generate_all(&raw_dir)?;

    Ok(())
}
