//! CSV export of the CDPH dataset.
//!
//! One row per release, sorted by release date:
//!
//! ```text
//! date,releaseNumber,cases,deaths,testsConducted,testsReceived,testsPending
//! 2020-03-10,NR20-010,133,,,,
//! ```
//!
//! Missing counts are written as empty cells.

use crate::store::CdphDataset;
use csv::WriterBuilder;
use serde::Serialize;
use std::error::Error;

/// Column names, in output order.
pub const CSV_HEADERS: [&str; 7] = [
    "date",
    "releaseNumber",
    "cases",
    "deaths",
    "testsConducted",
    "testsReceived",
    "testsPending",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    date: String,
    release_number: &'a str,
    cases: Option<u64>,
    deaths: Option<u64>,
    tests_conducted: Option<u64>,
    tests_received: Option<u64>,
    tests_pending: Option<u64>,
}

/// Render the dataset as CSV text.
pub fn render(dataset: &CdphDataset) -> Result<String, Box<dyn Error>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;

    for (_, record) in dataset.sorted() {
        writer.serialize(CsvRow {
            date: record.release_date.format("%Y-%m-%d").to_string(),
            release_number: &record.release_number,
            cases: record.cases,
            deaths: record.deaths,
            tests_conducted: record.tests_conducted,
            tests_received: record.tests_received,
            tests_pending: record.tests_pending,
        })?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{record, sample};

    #[test]
    fn test_render_header_and_sorted_rows() {
        let text = render(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "date,releaseNumber,cases,deaths,testsConducted,testsReceived,testsPending",
                "2020-03-10,NR20-010,133,,,,",
                "2020-03-11,NR20-011,157,3,,,",
                "2020-03-12,NR20-012,198,4,,1000,500",
            ]
        );
    }

    #[test]
    fn test_render_empty_dataset_is_header_only() {
        let text = render(&CdphDataset::default()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_rows_stay_sorted_when_inserted_out_of_order() {
        let mut dataset = CdphDataset::default();
        for (i, day) in [20u32, 3, 15, 9].into_iter().enumerate() {
            dataset.insert(
                format!("https://x/{i}"),
                record((2020, 4, day), &format!("NR{i}"), u64::from(day)),
            );
        }

        let text = render(&dataset).unwrap();
        let dates: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap())
            .collect();
        let mut expected = dates.clone();
        expected.sort();
        assert_eq!(dates, expected);
        assert_eq!(dates.first(), Some(&"2020-04-03"));
    }
}
