//! Data models for scraped press releases and NYT case feeds.
//!
//! - [`CdphRecord`]: one CDPH press release reduced to its headline numbers
//! - [`Snapshot`]: the persisted form of every record scraped so far
//! - [`StateRow`] / [`CountyRow`]: rows of the NYT `us-states.csv` and
//!   `us-counties.csv` feeds
//! - [`DailyTotals`]: a per-day cases/deaths point used for NYT charts
//!
//! Field names of the CDPH types are camelCase so the JSON snapshot and the
//! CSV header share one vocabulary.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The numbers extracted from a single CDPH "Latest COVID-19 Facts" release.
///
/// Only `release_date`, `release_number` and `cases` are guaranteed; every
/// other count is `None` when the release did not state it in a phrasing the
/// scraper recognises.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdphRecord {
    pub release_date: NaiveDate,
    /// Press release identifier such as `NR20-062`.
    pub release_number: String,
    pub cases: Option<u64>,
    pub deaths: Option<u64>,
    pub tests_conducted: Option<u64>,
    pub tests_received: Option<u64>,
    pub tests_pending: Option<u64>,
}

impl CdphRecord {
    /// One-line human summary, used when logging scraped or skipped releases.
    ///
    /// ```ignore
    /// Date: 2020-04-01 (NR20-041) - Cases: 8155, Deaths: 171, Tests: None (Received: 21772 / Pending: 57400)
    /// ```
    pub fn summary_line(&self) -> String {
        format!(
            "Date: {} ({}) - Cases: {}, Deaths: {}, Tests: {} (Received: {} / Pending: {})",
            self.release_date.format("%Y-%m-%d"),
            self.release_number,
            show(self.cases),
            show(self.deaths),
            show(self.tests_conducted),
            show(self.tests_received),
            show(self.tests_pending),
        )
    }
}

fn show(value: Option<u64>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

/// Everything written to `califData.json`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub save_date_time: DateTime<Local>,
    /// Records keyed by the URL of the release they came from.
    pub data: HashMap<String, CdphRecord>,
}

/// A row of the NYT `us-states.csv` feed.
#[derive(Debug, Clone, Deserialize)]
pub struct StateRow {
    pub date: NaiveDate,
    pub state: String,
    pub fips: Option<u32>,
    pub cases: i64,
    pub deaths: Option<i64>,
}

/// A row of the NYT `us-counties.csv` feed.
///
/// `fips` is blank for pseudo-counties such as "Unknown" or "New York City".
#[derive(Debug, Clone, Deserialize)]
pub struct CountyRow {
    pub date: NaiveDate,
    pub county: String,
    pub state: String,
    pub fips: Option<u32>,
    pub cases: i64,
    pub deaths: Option<i64>,
}

/// Cumulative cases and deaths on one day for some region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub cases: i64,
    pub deaths: i64,
}

impl From<&StateRow> for DailyTotals {
    fn from(row: &StateRow) -> Self {
        Self {
            date: row.date,
            cases: row.cases,
            deaths: row.deaths.unwrap_or(0),
        }
    }
}

impl From<&CountyRow> for DailyTotals {
    fn from(row: &CountyRow) -> Self {
        Self {
            date: row.date,
            cases: row.cases,
            deaths: row.deaths.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CdphRecord {
        CdphRecord {
            release_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
            release_number: "NR20-041".to_string(),
            cases: Some(8155),
            deaths: Some(171),
            tests_conducted: None,
            tests_received: Some(21772),
            tests_pending: Some(57400),
        }
    }

    #[test]
    fn test_summary_line_prints_none_for_missing_fields() {
        assert_eq!(
            record().summary_line(),
            "Date: 2020-04-01 (NR20-041) - Cases: 8155, Deaths: 171, Tests: None (Received: 21772 / Pending: 57400)"
        );
    }

    #[test]
    fn test_record_serializes_with_camel_case_names() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(json.contains("\"releaseDate\":\"2020-04-01\""));
        assert!(json.contains("\"releaseNumber\":\"NR20-041\""));
        assert!(json.contains("\"testsConducted\":null"));
    }

    #[test]
    fn test_snapshot_deserialization() {
        let json = r#"{
            "saveDateTime": "2020-04-02T09:15:00-07:00",
            "data": {
                "https://www.cdph.ca.gov/Programs/OPA/Pages/NR20-041.aspx": {
                    "releaseDate": "2020-04-01",
                    "releaseNumber": "NR20-041",
                    "cases": 8155,
                    "deaths": 171,
                    "testsConducted": null,
                    "testsReceived": 21772,
                    "testsPending": 57400
                }
            }
        }"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.data.len(), 1);
        let stored = snapshot.data.values().next().unwrap();
        assert_eq!(stored, &record());
    }

    #[test]
    fn test_daily_totals_from_county_row_defaults_missing_deaths() {
        let row = CountyRow {
            date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            county: "Unknown".to_string(),
            state: "California".to_string(),
            fips: None,
            cases: 4,
            deaths: None,
        };
        let totals = DailyTotals::from(&row);
        assert_eq!(totals.cases, 4);
        assert_eq!(totals.deaths, 0);
    }
}
