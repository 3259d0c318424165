//! CLI entry point for the UK economic data pipelines.
//!
//! Provides fetch/clean/report subcommands for each of the three pipelines
//! (cost of living, FTSE stocks, London housing) plus a filtered export of
//! the cleaned housing dataset.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use ukstats::{
    dashboard::{self, FilterState},
    fetch::BasicClient,
    housing, inflation, stocks,
};

#[derive(Parser)]
#[command(name = "ukstats")]
#[command(about = "UK cost-of-living, FTSE, and housing data pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download ONS inflation series and generate the supporting datasets
    FetchInflation {
        /// Directory for raw and processed inflation data
        #[arg(short, long, default_value = "data/cost_of_living")]
        data_dir: PathBuf,
    },
    /// Clean the fetched inflation data and build the cost-of-living database
    CleanInflation {
        #[arg(short, long, default_value = "data/cost_of_living")]
        data_dir: PathBuf,
    },
    /// Write inflation charts and the analysis report
    ReportInflation {
        #[arg(short, long, default_value = "data/cost_of_living")]
        data_dir: PathBuf,

        /// Directory for charts and reports
        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Download daily history for the FTSE universe
    FetchStocks {
        #[arg(short, long, default_value = "data/ftse")]
        data_dir: PathBuf,
    },
    /// Build performance summaries, charts, and the FTSE report
    AnalyzeStocks {
        #[arg(short, long, default_value = "data/ftse")]
        data_dir: PathBuf,

        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Download yearly Price Paid files and filter them to London
    FetchHousing {
        #[arg(short, long, default_value = "data/housing")]
        data_dir: PathBuf,

        /// Years to fetch
        #[arg(short, long, num_args = 1.., default_values_t = vec![2022u16, 2023, 2024])]
        years: Vec<u16>,
    },
    /// Clean the London data and build the housing database
    CleanHousing {
        #[arg(short, long, default_value = "data/housing")]
        data_dir: PathBuf,
    },
    /// Write housing charts and the market report
    ReportHousing {
        #[arg(short, long, default_value = "data/housing")]
        data_dir: PathBuf,

        #[arg(short, long, default_value = "output")]
        out_dir: PathBuf,
    },
    /// Export a filtered view of the cleaned housing transactions
    Export {
        #[arg(short, long, default_value = "data/housing")]
        data_dir: PathBuf,

        /// CSV file to write the filtered view to
        #[arg(short, long, default_value = "output/london_housing_filtered.csv")]
        output: PathBuf,

        /// Restrict to these years
        #[arg(long, num_args = 0..)]
        years: Vec<i32>,

        /// Restrict to these boroughs (e.g. CAMDEN)
        #[arg(long, num_args = 0..)]
        boroughs: Vec<String>,

        /// Restrict to these property type names (e.g. "Flat/Maisonette")
        #[arg(long, num_args = 0..)]
        property_types: Vec<String>,

        /// Minimum sale price (inclusive)
        #[arg(long)]
        min_price: Option<f64>,

        /// Maximum sale price (inclusive)
        #[arg(long)]
        max_price: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ukstats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ukstats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::FetchInflation { data_dir } => {
            let client = BasicClient::new();
            inflation::fetch::run(&client, &data_dir).await?;
        }
        Commands::CleanInflation { data_dir } => {
            let summary = inflation::clean::run(&data_dir)?;
            info!(
                master_rows = summary.master_rows,
                regional_rows = summary.regional_rows,
                wage_rows = summary.wage_rows,
                "inflation cleaning complete"
            );
        }
        Commands::ReportInflation { data_dir, out_dir } => {
            inflation::report::run(&data_dir, &out_dir)?;
        }
        Commands::FetchStocks { data_dir } => {
            let client = BasicClient::new();
            stocks::fetch::run(&client, &data_dir).await?;
        }
        Commands::AnalyzeStocks { data_dir, out_dir } => {
            stocks::report::run(&data_dir, &out_dir)?;
        }
        Commands::FetchHousing { data_dir, years } => {
            let client = BasicClient::new();
            housing::fetch::run(&client, &data_dir, &years).await?;
        }
        Commands::CleanHousing { data_dir } => {
            let stats = housing::clean::run(&data_dir)?;
            info!(
                kept = stats.kept,
                dropped = stats.input - stats.kept,
                "housing cleaning complete"
            );
        }
        Commands::ReportHousing { data_dir, out_dir } => {
            housing::report::run(&data_dir, &out_dir)?;
        }
        Commands::Export {
            data_dir,
            output,
            years,
            boroughs,
            property_types,
            min_price,
            max_price,
        } => {
            let transactions = dashboard::load_transactions(&data_dir)?;

            let price_range = match (min_price, max_price) {
                (None, None) => None,
                (min, max) => Some((
                    min.unwrap_or(0.0),
                    max.unwrap_or(f64::MAX),
                )),
            };
            let filter = FilterState {
                years: years.into_iter().collect(),
                boroughs: boroughs.into_iter().map(|b| b.to_uppercase()).collect(),
                property_types: property_types.into_iter().collect(),
                price_range,
            };

            let view = filter.apply(&transactions);
            let kpis = dashboard::compute_kpis(&view);
            info!(
                transactions = kpis.transactions,
                avg_price = kpis.avg_price as i64,
                median_price = kpis.median_price as i64,
                total_value = kpis.total_value as i64,
                boroughs = kpis.boroughs,
                "filtered view"
            );

            dashboard::export_csv(&output, &view)?;
        }
    }

    Ok(())
}
