//! Press-release scraping.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing**: Discover release URLs from the source's index page
//! 2. **Fetching**: Download each release and parse its figures
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | California Department of Public Health | [`cdph`] | HTML scraping | "Latest COVID-19 Facts" releases |
//!
//! The text heuristics shared by scrapers live in [`extract`]: releases are
//! free-form prose, so figures are located by searching phrases in the
//! normalized text of each element and reading the number in front of them.

pub mod cdph;
pub mod extract;
