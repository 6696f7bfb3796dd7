//! New York Times COVID-19 feeds.
//!
//! Reads the `us-states.csv` and `us-counties.csv` files published at
//! <https://github.com/nytimes/covid-19-data> from a local directory and
//! turns them into per-region daily series. Both feeds hold cumulative
//! counts, one row per region per day.

use crate::models::{CountyRow, DailyTotals, StateRow};
use crate::series::diff_i64;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, instrument};

pub const COUNTIES_FILE: &str = "us-counties.csv";
pub const STATES_FILE: &str = "us-states.csv";

/// The NYT state and county feeds loaded from one directory.
#[derive(Debug)]
pub struct NytData {
    counties_path: PathBuf,
    states_path: PathBuf,
    counties: Vec<CountyRow>,
    states: Vec<StateRow>,
}

impl NytData {
    /// Point at a directory holding the two feed files; nothing is read yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            counties_path: path.join(COUNTIES_FILE),
            states_path: path.join(STATES_FILE),
            counties: Vec::new(),
            states: Vec::new(),
        }
    }

    pub fn filenames(&self) -> [&Path; 2] {
        [&self.counties_path, &self.states_path]
    }

    /// Read both feed files, replacing any rows loaded before.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or has a row that does not
    /// match the NYT column layout (`date,county,state,fips,cases,deaths` or
    /// `date,state,fips,cases,deaths`).
    pub fn load_source(&mut self) -> Result<(), Box<dyn Error>> {
        self.load_counties()?;
        self.load_states()?;
        Ok(())
    }

    /// Read `us-counties.csv`.
    #[instrument(level = "info", skip_all, fields(path = %self.counties_path.display()))]
    pub fn load_counties(&mut self) -> Result<(), Box<dyn Error>> {
        self.counties = read_rows(&self.counties_path)?;
        info!(rows = self.counties.len(), "Loaded NYT counties");
        Ok(())
    }

    #[instrument(level = "info", skip_all, fields(path = %self.states_path.display()))]
    pub fn load_states(&mut self) -> Result<(), Box<dyn Error>> {
        self.states = read_rows(&self.states_path)?;
        info!(rows = self.states.len(), "Loaded NYT states");
        Ok(())
    }

    /// Latest modification time of the feed files.
    pub fn modification_time(&self) -> Result<SystemTime, Box<dyn Error>> {
        let mut latest = SystemTime::UNIX_EPOCH;
        for path in self.filenames() {
            latest = latest.max(std::fs::metadata(path)?.modified()?);
        }
        Ok(latest)
    }

    /// Daily totals of one state, on or after `start` when given.
    pub fn state(&self, name: &str, start: Option<NaiveDate>) -> Vec<DailyTotals> {
        self.states
            .iter()
            .filter(|row| row.state == name && on_or_after(row.date, start))
            .map(DailyTotals::from)
            .collect()
    }

    /// Sum of several states for every date in the states feed.
    ///
    /// With `states` of `None` every state in the feed is summed.
    pub fn states_sum(&self, states: Option<&[String]>, start: Option<NaiveDate>) -> Vec<DailyTotals> {
        let selected = |row: &&StateRow| states.is_none_or(|names| names.contains(&row.state));
        let dates = self.states.iter().map(|row| row.date);
        let rows = self.states.iter().filter(selected).map(DailyTotals::from);
        sum_by_date(dates, rows, start)
    }

    /// Daily totals of one county, on or after `start` when given.
    pub fn county(&self, county: &str, state: &str, start: Option<NaiveDate>) -> Vec<DailyTotals> {
        self.counties
            .iter()
            .filter(|row| row.county == county && row.state == state && on_or_after(row.date, start))
            .map(DailyTotals::from)
            .collect()
    }

    /// Sum of several counties of one state for every date in the counties
    /// feed.
    pub fn counties_sum(
        &self,
        counties: &[String],
        state: &str,
        start: Option<NaiveDate>,
    ) -> Vec<DailyTotals> {
        let dates = self.counties.iter().map(|row| row.date);
        let rows = self
            .counties
            .iter()
            .filter(|row| row.state == state && counties.contains(&row.county))
            .map(DailyTotals::from);
        sum_by_date(dates, rows, start)
    }
}

/// Day-over-day change of `cases - deaths`.
pub fn new_cases(series: &[DailyTotals]) -> Vec<i64> {
    let open: Vec<i64> = series.iter().map(|d| d.cases - d.deaths).collect();
    diff_i64(&open)
}

fn on_or_after(date: NaiveDate, start: Option<NaiveDate>) -> bool {
    start.is_none_or(|start| date >= start)
}

/// Zero-filled totals for every date in `dates`, with `rows` added in.
fn sum_by_date(
    dates: impl Iterator<Item = NaiveDate>,
    rows: impl Iterator<Item = DailyTotals>,
    start: Option<NaiveDate>,
) -> Vec<DailyTotals> {
    let mut totals: BTreeMap<NaiveDate, (i64, i64)> = dates.map(|d| (d, (0, 0))).collect();
    for row in rows {
        let entry = totals.entry(row.date).or_default();
        entry.0 += row.cases;
        entry.1 += row.deaths;
    }

    totals
        .into_iter()
        .filter(|(date, _)| on_or_after(*date, start))
        .map(|(date, (cases, deaths))| DailyTotals {
            date,
            cases,
            deaths,
        })
        .collect()
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
