//! Command-line interface definitions for Covid Feeds.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Paths can be provided via command-line flags or environment variables.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Covid Feeds application.
///
/// # Examples
///
/// ```sh
/// # Scrape new CDPH releases into ./data
/// covid_feeds fetch
///
/// # Re-parse every release, with custom settings
/// covid_feeds -c settings.yaml fetch --force
///
/// # Draw the charts
/// covid_feeds plot-cdph -p ./plots
/// covid_feeds plot-nyt -d ./data -p ./plots
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a settings.yaml file
    #[arg(short, long, global = true, env = "COVID_FEEDS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape CDPH press releases into the local snapshot and CSV export
    Fetch {
        #[command(flatten)]
        data: DataPath,

        /// Re-parse releases already present in the snapshot
        #[arg(short, long)]
        force: bool,
    },
    /// Draw the CDPH charts from the local snapshot
    PlotCdph(PlotArgs),
    /// Draw the NYT charts from `<data-path>/nytimes`
    PlotNyt(PlotArgs),
}

#[derive(Args, Debug)]
pub struct DataPath {
    /// Directory holding califData.json, califData.csv and nytimes/
    #[arg(short, long, env = "COVID_FEEDS_DATA_PATH", default_value = "./data")]
    pub data_path: PathBuf,
}

#[derive(Args, Debug)]
pub struct PlotArgs {
    #[command(flatten)]
    pub data: DataPath,

    /// Output directory for the SVG charts
    #[arg(short, long, env = "COVID_FEEDS_PLOTS_PATH", default_value = "./plots")]
    pub plots_path: PathBuf,
}
