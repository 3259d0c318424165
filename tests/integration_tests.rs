//! End-to-end pipeline tests: generate -> clean -> store -> report, all
//! against temporary directories.

use std::fs;
use ukstats::dashboard::{self, FilterState};
use ukstats::{housing, inflation};

#[test]
fn inflation_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("cost_of_living");
    let out_dir = dir.path().join("output");

    // Fetch stage minus the network: generated datasets only.
    inflation::sample::generate_all(&data_dir.join("raw")).unwrap();

    let summary = inflation::clean::run(&data_dir).unwrap();
    assert!(summary.master_rows > 100);
    assert!(summary.regional_rows > 0);
    assert!(summary.basket_rows > 0);

    assert!(data_dir.join("cost_of_living.db").exists());
    assert!(data_dir.join("processed/master_cpi_data.csv").exists());

    inflation::report::run(&data_dir, &out_dir).unwrap();

    assert!(out_dir.join("charts/inflation_timeline.json").exists());
    let report = fs::read_to_string(out_dir.join("reports/analysis_report.txt")).unwrap();
    assert!(report.contains("CURRENT STATE"));
    assert!(report.contains("END OF REPORT"));
}

const LONDON_ROWS: &str = "\
transaction_id,price,date_of_transfer,postcode,property_type,old_new,duration,paon,saon,street,locality,town_city,district,county,ppd_category,record_status
{A1},450000,2023-03-15 00:00,SE15 4AB,F,N,L,12,,RYE LANE,,LONDON,SOUTHWARK,GREATER LONDON,A,A
{A2},900000,2023-06-20 00:00,SW1A 1AA,T,N,F,3,,WHITEHALL,,LONDON,WESTMINSTER,GREATER LONDON,A,A
{A3},320000,2024-01-10 00:00,DA5 1AB,S,N,F,7,,HIGH ST,,BEXLEY,BEXLEY,GREATER LONDON,A,A
{A3},320000,2024-01-10 00:00,DA5 1AB,S,N,F,7,,HIGH ST,,BEXLEY,BEXLEY,GREATER LONDON,A,A
{A4},5000,2024-02-10 00:00,DA5 1AB,S,N,F,7,,HIGH ST,,BEXLEY,BEXLEY,GREATER LONDON,A,A
";

#[test]
fn housing_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("housing");
    let out_dir = dir.path().join("output");

    let processed = data_dir.join("processed");
    fs::create_dir_all(&processed).unwrap();
    fs::write(processed.join("london-pp-2023.csv"), LONDON_ROWS).unwrap();

    let stats = housing::clean::run(&data_dir).unwrap();
    assert_eq!(stats.kept, 3);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.price_outliers, 1);

    assert!(data_dir.join("housing_market.db").exists());

    housing::report::run(&data_dir, &out_dir).unwrap();
    assert!(out_dir.join("charts/housing_borough_prices.json").exists());
    let report = fs::read_to_string(out_dir.join("reports/housing_report.txt")).unwrap();
    assert!(report.contains("LONDON HOUSING MARKET REPORT"));

    // Dashboard boundary over the cleaned dataset.
    let transactions = dashboard::load_transactions(&data_dir).unwrap();
    assert_eq!(transactions.len(), 3);

    let filter = FilterState {
        years: [2023].into_iter().collect(),
        ..Default::default()
    };
    let view = filter.apply(&transactions);
    assert_eq!(view.len(), 2);

    let kpis = dashboard::compute_kpis(&view);
    assert_eq!(kpis.transactions, 2);
    assert_eq!(kpis.avg_price, 675_000.0);

    let export_path = out_dir.join("london_housing_filtered.csv");
    dashboard::export_csv(&export_path, &view).unwrap();
    assert!(export_path.exists());
}
