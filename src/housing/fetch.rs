//! Download stage for the housing pipeline.
//!
//! Yearly Price Paid files are large and immutable once published, so
//! downloads are skipped when the file is already on disk. Each file is then
//! stream-filtered to London districts row by row; the full national file is
//! never held in memory.

use crate::fetch::{HttpClient, download_to_file};
use crate::housing::records::{RawTransaction, is_london_district};
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::path::Path;
use tracing::{error, info};

const BASE_URL: &str =
    "http://prod.publicdata.landregistry.gov.uk.s3-website-eu-west-1.amazonaws.com";

/// Years fetched by default. Older files exist but three years keeps the
/// dataset a manageable size.
pub const DEFAULT_YEARS: &[u16] = &[2022, 2023, 2024];

fn year_url(year: u16) -> String {
    format!("{BASE_URL}/pp-{year}.csv")
}

/// Streams a headerless yearly file and writes the London-only subset (with
/// headers) to `dest`. Returns the number of London rows kept.
pub fn filter_london(source: &Path, dest: &Path) -> Result<u64> {
    let input = File::open(source).with_context(|| format!("opening {}", source.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(input);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(dest).with_context(|| format!("creating {}", dest.display()))?;

    let mut kept = 0u64;
    for row in reader.deserialize::<RawTransaction>() {
        // A torn row in a multi-gigabyte feed is not worth aborting over.
        let Ok(raw) = row else { continue };
        let is_london = raw
            .district
            .as_deref()
            .is_some_and(is_london_district);
        if is_london {
            writer.serialize(&raw)?;
            kept += 1;
        }
    }
    writer.flush()?;

    info!(
        source = %source.display(),
        kept,
        "London filter finished"
    );
    Ok(kept)
}

/// Runs the full fetch stage for the given years (or [`DEFAULT_YEARS`]).
/// A year that fails to download is logged and skipped; the stage fails only
/// when no year survives.
pub async fn run<C: HttpClient>(client: &C, data_dir: &Path, years: &[u16]) -> Result<()> {
    let raw_dir = data_dir.join("raw");
    let processed_dir = data_dir.join("processed");
    let mut succeeded = 0usize;

    for &year in years {
        let filename = format!("pp-{year}.csv");
        let url = year_url(year);

        if let Err(e) = download_to_file(client, &url, &raw_dir, &filename).await {
            error!(year, error = %e, "download failed, skipping year");
            continue;
        }

        let source = raw_dir.join(&filename);
        let dest = processed_dir.join(format!("london-pp-{year}.csv"));
        match filter_london(&source, &dest) {
            Ok(kept) => {
                info!(year, london_rows = kept, "year ready");
                succeeded += 1;
            }
            Err(e) => {
                error!(year, error = %e, "London filter failed, skipping year");
            }
        }
    }

    if succeeded == 0 {
        bail!("no Price Paid year could be fetched");
    }
    info!(years = succeeded, total = years.len(), "housing fetch finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LONDON_ROW: &str = "\"{T1}\",450000,\"2023-08-15 00:00\",\"SE15 4AB\",\"F\",\"N\",\"L\",\"12\",\"\",\"RYE LANE\",\"\",\"LONDON\",\"SOUTHWARK\",\"GREATER LONDON\",\"A\",\"A\"";
    const LEEDS_ROW: &str = "\"{T2}\",210000,\"2023-08-16 00:00\",\"LS1 4AB\",\"S\",\"N\",\"F\",\"3\",\"\",\"KIRKGATE\",\"\",\"LEEDS\",\"LEEDS\",\"WEST YORKSHIRE\",\"A\",\"A\"";

    #[test]
    fn test_filter_keeps_only_london() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("pp-2023.csv");
        fs::write(&source, format!("{LONDON_ROW}\n{LEEDS_ROW}\n")).unwrap();

        let dest = dir.path().join("london-pp-2023.csv");
        let kept = filter_london(&source, &dest).unwrap();

        assert_eq!(kept, 1);
        let content = fs::read_to_string(&dest).unwrap();
        assert!(content.contains("SOUTHWARK"));
        assert!(!content.contains("LEEDS"));
        // Output carries headers for downstream loading.
        assert!(content.starts_with("transaction_id,"));
    }

    #[test]
    fn test_filter_skips_torn_rows() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("pp-2023.csv");
        fs::write(&source, format!("{LONDON_ROW}\nnot,enough,fields\n")).unwrap();

        let dest = dir.path().join("out.csv");
        assert_eq!(filter_london(&source, &dest).unwrap(), 1);
    }

    #[test]
    fn test_year_url() {
        assert_eq!(
            year_url(2024),
            "http://prod.publicdata.landregistry.gov.uk.s3-website-eu-west-1.amazonaws.com/pp-2024.csv"
        );
    }
}
