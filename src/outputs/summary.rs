//! Headline ratios for the most recent CDPH release.

use crate::models::CdphRecord;
use tracing::{info, warn};

/// Ratios derived from one release.
#[derive(Debug, Clone, PartialEq)]
pub struct NewestSummary {
    pub line: String,
    /// Deaths per case, in percent.
    pub case_fatality_pct: Option<f64>,
    pub cases_per_test: Option<f64>,
}

impl NewestSummary {
    pub fn from_record(record: &CdphRecord) -> Self {
        Self {
            line: record.summary_line(),
            case_fatality_pct: ratio(record.deaths, record.cases).map(|r| r * 100.0),
            cases_per_test: ratio(record.cases, record.tests_received),
        }
    }

    /// Log the summary under a `California (CDPH)` heading.
    pub fn log(&self) {
        info!(record = %self.line, "California (CDPH)");
        match self.case_fatality_pct {
            Some(pct) => info!(
                "Case fatality rate (*): {pct:.3} % (* uses all cases rather than closed cases; recovered counts are not published)"
            ),
            None => warn!("Case fatality rate unavailable for the newest release"),
        }
        match self.cases_per_test {
            Some(ratio) => info!("Cases per test received: {ratio:.3}"),
            None => warn!("Cases per test unavailable for the newest release"),
        }
    }
}

fn ratio(numerator: Option<u64>, denominator: Option<u64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0 => Some(n as f64 / d as f64),
        _ => None,
    }
}
