//! Output generation for the collected data.
//!
//! # Submodules
//!
//! - [`csv`]: Exports the CDPH dataset as `califData.csv`
//! - [`summary`]: Headline ratios of the newest CDPH release
//! - [`charts`]: Generic multi-panel SVG time-series rendering
//! - [`figures`]: The CDPH and NYT figures built on [`charts`]
//!
//! # Output Structure
//!
//! ```text
//! data_path/
//! ├── califData.json      # CDPH snapshot
//! ├── califData.csv       # CDPH export
//! └── nytimes/            # NYT feeds (read only)
//!
//! plots_path/
//! ├── cdph_ca_cases.svg
//! ├── cdph_ca_tests.svg
//! ├── nyt_california.svg
//! └── nyt_states.svg
//! ```

pub mod charts;
pub mod csv;
pub mod figures;
pub mod summary;
