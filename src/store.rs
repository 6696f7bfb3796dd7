//! Persistence for scraped CDPH records.
//!
//! The dataset lives in `<data_path>/califData.json` between runs and is
//! exported to `<data_path>/califData.csv` after every refresh. Records are
//! held in an unordered map keyed by release URL; every ordered view sorts by
//! `(release date, url)`.

use crate::models::{CdphRecord, Snapshot};
use crate::outputs::csv;
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const SNAPSHOT_FILE: &str = "califData.json";
pub const CSV_FILE: &str = "califData.csv";

/// Every CDPH record scraped so far.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CdphDataset {
    data: HashMap<String, CdphRecord>,
}

/// Column-oriented view of a dataset, sorted by date, with `NaN` for
/// missing counts.
#[derive(Debug, Default, Clone)]
pub struct CdphSeries {
    pub dates: Vec<NaiveDate>,
    pub cases: Vec<f64>,
    pub deaths: Vec<f64>,
    pub tests_conducted: Vec<f64>,
    pub tests_received: Vec<f64>,
    pub tests_pending: Vec<f64>,
}

impl CdphDataset {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&CdphRecord> {
        self.data.get(url)
    }

    /// Insert or replace the record scraped from `url`.
    pub fn insert(&mut self, url: String, record: CdphRecord) {
        self.data.insert(url, record);
    }

    /// `(url, record)` pairs sorted by release date, then URL.
    pub fn sorted(&self) -> Vec<(&str, &CdphRecord)> {
        let mut entries: Vec<(&str, &CdphRecord)> = self
            .data
            .iter()
            .map(|(url, record)| (url.as_str(), record))
            .collect();
        entries.sort_by(|a, b| (a.1.release_date, a.0).cmp(&(b.1.release_date, b.0)));
        entries
    }

    /// The most recent release, if any.
    pub fn newest(&self) -> Option<&CdphRecord> {
        self.data
            .iter()
            .max_by(|a, b| (a.1.release_date, a.0).cmp(&(b.1.release_date, b.0)))
            .map(|(_, record)| record)
    }

    pub fn to_series(&self) -> CdphSeries {
        let mut series = CdphSeries::default();
        for (_, record) in self.sorted() {
            series.dates.push(record.release_date);
            series.cases.push(as_f64(record.cases));
            series.deaths.push(as_f64(record.deaths));
            series.tests_conducted.push(as_f64(record.tests_conducted));
            series.tests_received.push(as_f64(record.tests_received));
            series.tests_pending.push(as_f64(record.tests_pending));
        }
        series
    }

    /// Load the snapshot from `data_path`, or start empty when there is none.
    ///
    /// # Arguments
    ///
    /// * `data_path` - Directory holding `califData.json`
    ///
    /// # Returns
    ///
    /// The saved records, or an empty dataset when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or parsed.
    #[instrument(level = "info", skip_all, fields(data_path = %data_path.display()))]
    pub async fn load(data_path: &Path) -> Result<Self, Box<dyn Error>> {
        let path = data_path.join(SNAPSHOT_FILE);
        if !fs::try_exists(&path).await? {
            warn!(path = %path.display(), "No data file!");
            return Ok(Self::default());
        }

        info!(path = %path.display(), "Loading data");
        let text = fs::read_to_string(&path).await?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        info!(
            records = snapshot.data.len(),
            saved_at = %snapshot.save_date_time,
            "Loaded snapshot"
        );
        Ok(Self {
            data: snapshot.data,
        })
    }

    /// Write the whole dataset to the snapshot file, stamped with the
    /// current time.
    ///
    /// # Arguments
    ///
    /// * `data_path` - Output directory; created if missing
    ///
    /// # Returns
    ///
    /// The path of the written `califData.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    #[instrument(level = "info", skip_all, fields(data_path = %data_path.display()))]
    pub async fn save(&self, data_path: &Path) -> Result<PathBuf, Box<dyn Error>> {
        fs::create_dir_all(data_path).await?;
        let path = data_path.join(SNAPSHOT_FILE);
        let snapshot = Snapshot {
            save_date_time: Local::now(),
            data: self.data.clone(),
        };

        info!(path = %path.display(), records = self.len(), "Saving data");
        fs::write(&path, serde_json::to_string_pretty(&snapshot)?).await?;
        Ok(path)
    }

    /// Export the dataset as CSV next to the snapshot.
    #[instrument(level = "info", skip_all, fields(data_path = %data_path.display()))]
    pub async fn write_csv(&self, data_path: &Path) -> Result<PathBuf, Box<dyn Error>> {
        fs::create_dir_all(data_path).await?;
        let path = data_path.join(CSV_FILE);

        info!(path = %path.display(), records = self.len(), "Exporting data");
        fs::write(&path, csv::render(self)?).await?;
        Ok(path)
    }
}

fn as_f64(value: Option<u64>) -> f64 {
    value.map_or(f64::NAN, |v| v as f64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn record(date: (i32, u32, u32), number: &str, cases: u64) -> CdphRecord {
        CdphRecord {
            release_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            release_number: number.to_string(),
            cases: Some(cases),
            deaths: None,
            tests_conducted: None,
            tests_received: None,
            tests_pending: None,
        }
    }

    pub(crate) fn sample() -> CdphDataset {
        let mut dataset = CdphDataset::default();
        dataset.insert("https://x/NR20-012.aspx".to_string(), {
            let mut r = record((2020, 3, 12), "NR20-012", 198);
            r.deaths = Some(4);
            r.tests_received = Some(1_000);
            r.tests_pending = Some(500);
            r
        });
        dataset.insert(
            "https://x/NR20-010.aspx".to_string(),
            record((2020, 3, 10), "NR20-010", 133),
        );
        dataset.insert("https://x/NR20-011.aspx".to_string(), {
            let mut r = record((2020, 3, 11), "NR20-011", 157);
            r.deaths = Some(3);
            r
        });
        dataset
    }

    #[test]
    fn test_sorted_orders_by_date() {
        let dataset = sample();
        let numbers: Vec<&str> = dataset
            .sorted()
            .into_iter()
            .map(|(_, r)| r.release_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["NR20-010", "NR20-011", "NR20-012"]);
    }

    #[test]
    fn test_sorted_breaks_date_ties_by_url() {
        let mut dataset = CdphDataset::default();
        dataset.insert("https://x/b".to_string(), record((2020, 3, 10), "B", 1));
        dataset.insert("https://x/a".to_string(), record((2020, 3, 10), "A", 1));
        let urls: Vec<&str> = dataset.sorted().into_iter().map(|(u, _)| u).collect();
        assert_eq!(urls, vec!["https://x/a", "https://x/b"]);
    }

    #[test]
    fn test_newest() {
        assert_eq!(sample().newest().unwrap().release_number, "NR20-012");
        assert!(CdphDataset::default().newest().is_none());
    }

    #[test]
    fn test_to_series_uses_each_fields_own_nullability() {
        let series = sample().to_series();
        assert_eq!(series.dates.len(), 3);
        assert_eq!(series.cases, vec![133.0, 157.0, 198.0]);
        assert!(series.deaths[0].is_nan());
        assert_eq!(series.deaths[1], 3.0);
        assert!(series.tests_received[1].is_nan());
        assert_eq!(series.tests_received[2], 1_000.0);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_preserves_records() {
        let dir = TempDir::new().unwrap();
        let dataset = sample();
        dataset.save(dir.path()).await.unwrap();

        let loaded = CdphDataset::load(dir.path()).await.unwrap();
        assert_eq!(loaded.len(), dataset.len());
        assert_eq!(loaded, dataset);
    }

    #[tokio::test]
    async fn test_load_without_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = CdphDataset::load(dir.path()).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_snapshot_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE), "{not json").unwrap();
        assert!(CdphDataset::load(dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_write_csv_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data");
        let path = sample().write_csv(&data_path).await.unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2020-03-10,NR20-010,133"));
    }
}
