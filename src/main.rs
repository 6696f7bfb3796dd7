//! # Covid Feeds
//!
//! Collects California COVID-19 figures and charts them.
//!
//! ## Features
//!
//! - Scrapes the "Latest COVID-19 Facts" press releases of the California
//!   Department of Public Health (CDPH) with text heuristics
//! - Keeps the parsed releases in a local JSON snapshot and a CSV export
//! - Reads the New York Times state and county feeds from a local checkout
//! - Draws multi-panel SVG charts with shelter-in-place markers
//!
//! ## Usage
//!
//! ```sh
//! covid_feeds fetch -d ./data
//! covid_feeds plot-cdph -d ./data -p ./plots
//! covid_feeds plot-nyt -d ./data -p ./plots
//! ```
//!
//! ## Architecture
//!
//! 1. **Indexing**: Discover release URLs on the CDPH news-release page
//! 2. **Fetching**: Download and parse each release not yet in the snapshot
//! 3. **Persisting**: Write `califData.json` and `califData.csv`
//! 4. **Plotting**: Turn the snapshot or the NYT feeds into SVG charts

use chrono::{DateTime, Local};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod models;
mod nyt;
mod outputs;
mod scrapers;
mod series;
mod store;
mod utils;

use cli::{Cli, Command};
use config::Settings;
use nyt::NytData;
use outputs::{figures, summary::NewestSummary};
use store::CdphDataset;
use utils::ensure_writable_dir;

/// Directory under the data path holding the NYT feed files.
const NYT_DIR: &str = "nytimes";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("covid_feeds starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref()).await?;

    let result = match args.command {
        Command::Fetch { data, force } => fetch(&data.data_path, &settings, force).await,
        Command::PlotCdph(plot) => plot_cdph(&plot.data.data_path, &plot.plots_path, &settings).await,
        Command::PlotNyt(plot) => plot_nyt(&plot.data.data_path, &plot.plots_path, &settings).await,
    };
    if let Err(ref e) = result {
        error!(error = %e, "Command failed");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    result
}

/// Scrape new CDPH releases, then rewrite the snapshot and the CSV export.
#[instrument(level = "info", skip_all, fields(data_path = %data_path.display(), force = force))]
async fn fetch(data_path: &Path, settings: &Settings, force: bool) -> Result<(), Box<dyn Error>> {
    // Early check: a read-only data dir would only fail after the whole scrape
    ensure_writable_dir(data_path).await?;

    let mut dataset = CdphDataset::load(data_path).await?;
    let refreshed = scrapers::cdph::refresh(&mut dataset, &settings.cdph, force).await?;

    let snapshot = dataset.save(data_path).await?;
    let csv = dataset.write_csv(data_path).await?;
    info!(
        snapshot = %snapshot.display(),
        csv = %csv.display(),
        records = dataset.len(),
        parsed = refreshed.parsed,
        "Data saved"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(data_path = %data_path.display()))]
async fn plot_cdph(data_path: &Path, plots_path: &Path, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let dataset = CdphDataset::load(data_path).await?;
    let Some(newest) = dataset.newest() else {
        return Err(format!("no CDPH records under {}; run `fetch` first", data_path.display()).into());
    };
    NewestSummary::from_record(newest).log();

    ensure_writable_dir(plots_path).await?;
    let written = figures::write_cdph_figures(&dataset.to_series(), &settings.annotations, plots_path).await?;
    info!(count = written.len(), "CDPH figures written");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(data_path = %data_path.display()))]
async fn plot_nyt(data_path: &Path, plots_path: &Path, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let mut data = NytData::new(data_path.join(NYT_DIR));
    data.load_source()?;
    let modified: DateTime<Local> = data.modification_time()?.into();
    info!(modified = %modified.format("%Y-%m-%d %H:%M"), "NYT data last modified");

    ensure_writable_dir(plots_path).await?;
    let written = figures::write_nyt_figures(&data, &settings.nyt, &settings.annotations, plots_path).await?;
    info!(count = written.len(), "NYT figures written");
    Ok(())
}
