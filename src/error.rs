//! Error types for press-release parsing.
//!
//! Everything else in the crate propagates `Box<dyn Error>`; these variants
//! exist so callers and tests can tell which part of a release was unreadable.

use thiserror::Error;

/// Failures raised while turning a CDPH press release into a record.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScrapeError {
    /// No `Date:` line on the page.
    #[error("no release date found in {url}")]
    MissingDate { url: String },

    /// More than one distinct `Date:` value on the page.
    #[error("expected exactly one release date in {url}, found {found:?}")]
    AmbiguousDate { url: String, found: Vec<String> },

    /// The `Date:` value is not in `Month day, year` form.
    #[error("unparsable release date {value:?} in {url}")]
    InvalidDate { url: String, value: String },

    /// No `Number:` line on the page.
    #[error("no release number found in {url}")]
    MissingReleaseNumber { url: String },

    /// More than one distinct `Number:` value on the page.
    #[error("expected exactly one release number in {url}, found {found:?}")]
    AmbiguousReleaseNumber { url: String, found: Vec<String> },

    /// None of the case-count phrasings matched.
    #[error("failed to find the number of cases in {url}")]
    MissingCases { url: String },
}
