//! CDPH "Latest COVID-19 Facts" press-release scraper.
//!
//! The California Department of Public Health publishes its daily counts as
//! prose press releases linked from a yearly news-release index. Releases are
//! discovered on the index page, then each one is reduced to a
//! [`CdphRecord`] by searching its text with the phrasings CDPH has used over
//! time, most common first.

use crate::config::CdphSettings;
use crate::error::ScrapeError;
use crate::models::CdphRecord;
use crate::scrapers::extract::{find_strings, leading_number, pattern, phrase_regex};
use crate::store::CdphDataset;
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

static DATE_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("Date:"));
static DATE_VALUE: Lazy<Regex> = Lazy::new(|| pattern(r"Date:\s*([A-Za-z]+ \d{1,2}, ?\d{4})"));
static NUMBER_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("Number:"));
static NUMBER_VALUE: Lazy<Regex> = Lazy::new(|| pattern(r"Number:\s*(\S+)"));

static CONFIRMED_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("confirmed cases"));
static CONFIRMED_CASES: Lazy<Regex> = Lazy::new(|| pattern("[0-9,]+ confirmed cases."));
static CONFIRMED_DEATHS: Lazy<Regex> = Lazy::new(|| pattern("[0-9,]+ deaths"));

static POSITIVE_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("Positive cases"));
static POSITIVE_CASES: Lazy<Regex> = Lazy::new(|| pattern("[0-9,]+...Positive cases"));

static DEATH_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("[0-9,]+...Death"));
static DEATH_COUNT: Lazy<Regex> = Lazy::new(|| pattern("[0-9,]+...Death"));

static CONDUCTED_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("tests had been conducted"));
static TESTS_CONDUCTED: Lazy<Regex> = Lazy::new(|| pattern("[0-9,+*]+ tests had been conducted"));

static RECEIVED_LINE: Lazy<Regex> = Lazy::new(|| phrase_regex("results have been received"));
static TESTS_RECEIVED: Lazy<Regex> = Lazy::new(|| pattern("[0-9,+*]+ results have been received"));
static TESTS_PENDING: Lazy<Regex> = Lazy::new(|| pattern("[0-9,+*]+ are pending"));

/// First release counting every test conducted instead of persons tested.
/// See <https://www.cdph.ca.gov/Programs/OPA/Pages/NR20-062.aspx>.
static PER_TEST_REPORTING: Lazy<NaiveDate> =
    Lazy::new(|| NaiveDate::from_ymd_opt(2020, 4, 23).unwrap_or_default());

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").unwrap_or_else(|e| panic!("invalid selector: {e}")));

/// Outcome of a [`refresh`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub indexed: usize,
    pub parsed: usize,
    pub skipped: usize,
}

/// Absolute URLs of every release link on the index page, in page order.
///
/// A link qualifies when any text inside it contains `link_text`. Relative
/// hrefs are resolved against `base`; duplicates keep their first position.
pub fn release_links(html: &str, base: &Url, link_text: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter(|link| link.text().any(|text| text.contains(link_text)))
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| url.to_string())
        .unique()
        .collect()
}

/// Fetch the news-release index and list the COVID-19 release URLs on it.
///
/// # Arguments
///
/// * `settings` - Where the index page lives and which link text marks a release
///
/// # Returns
///
/// Absolute release URLs in page order, without duplicates.
///
/// # Errors
///
/// Returns an error if the index URL is invalid or the page cannot be fetched.
#[instrument(level = "info", skip_all)]
pub async fn index_releases(settings: &CdphSettings) -> Result<Vec<String>, Box<dyn Error>> {
    let index_url = settings.news_release_url()?;
    let base_url = Url::parse(&settings.base_url)?;
    info!(url = %index_url, "Querying CDPH website");

    let html = get_text(index_url.as_str()).await?;
    let urls = release_links(&html, &base_url, &settings.link_text);

    info!(count = urls.len(), "Indexed CDPH release URLs");
    debug!(?urls, "CDPH URLs");
    Ok(urls)
}

/// Download one release and parse it.
///
/// # Errors
///
/// Returns an error on any HTTP failure, or the [`ScrapeError`] of
/// [`parse_release`].
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_release(url: &str) -> Result<CdphRecord, Box<dyn Error>> {
    let html = get_text(url).await?;
    info!(bytes = html.len(), "Fetched CDPH release");
    Ok(parse_release(url, &html)?)
}

/// Scrape every indexed release not already in `dataset`.
///
/// With `force`, releases already present are parsed again and replaced.
/// The first release that cannot be fetched, or whose case count cannot be
/// found, aborts the refresh; records parsed before it stay in `dataset`.
///
/// # Arguments
///
/// * `dataset` - Records loaded from the snapshot; new records are inserted here
/// * `settings` - CDPH index location
/// * `force` - Re-parse releases that are already in `dataset`
///
/// # Returns
///
/// Counts of indexed, parsed and skipped releases.
#[instrument(level = "info", skip_all, fields(force = force))]
pub async fn refresh(
    dataset: &mut CdphDataset,
    settings: &CdphSettings,
    force: bool,
) -> Result<RefreshSummary, Box<dyn Error>> {
    let urls = index_releases(settings).await?;
    let todo = pending(dataset, &urls, force);
    let mut summary = RefreshSummary {
        indexed: urls.len(),
        skipped: urls.len() - todo.len(),
        ..RefreshSummary::default()
    };

    for url in todo {
        let record = fetch_release(url).await?;
        info!(%url, record = %record.summary_line(), "Parsed release");
        dataset.insert(url.to_string(), record);
        summary.parsed += 1;
    }

    info!(
        indexed = summary.indexed,
        parsed = summary.parsed,
        skipped = summary.skipped,
        "CDPH refresh complete"
    );
    Ok(summary)
}

/// The URLs of `urls` that need fetching, in order.
///
/// Without `force`, URLs already in `dataset` are logged and left out.
fn pending<'a>(dataset: &CdphDataset, urls: &'a [String], force: bool) -> Vec<&'a str> {
    urls.iter()
        .map(String::as_str)
        .filter(|url| match dataset.get(url) {
            Some(existing) if !force => {
                info!(%url, record = %existing.summary_line(), "Already parsed, skipping");
                false
            }
            _ => true,
        })
        .collect()
}

/// Reduce the HTML of one release to a [`CdphRecord`].
///
/// Cases and deaths are looked for in the "confirmed cases" paragraph first,
/// then in the "# - Positive cases" / "# - Deaths" list layout. A missing
/// case count is an error; a missing death count only logs a warning.
/// Test counts are optional.
///
/// # Errors
///
/// Returns [`ScrapeError`] when the release date or number is missing,
/// ambiguous, or malformed, or when no case count can be found.
pub fn parse_release(url: &str, html: &str) -> Result<CdphRecord, ScrapeError> {
    let document = Html::parse_document(html);

    let release_date = release_date(url, &document)?;
    let release_number = release_number(url, &document)?;
    debug!(%release_date, %release_number, "Parsed release header");

    let confirmed = find_strings(&document, &CONFIRMED_LINE);
    let mut cases = leading_number(&confirmed, &CONFIRMED_CASES);
    let mut deaths = leading_number(&confirmed, &CONFIRMED_DEATHS);

    if cases.is_none() {
        let strings = find_strings(&document, &POSITIVE_LINE);
        cases = leading_number(&strings, &POSITIVE_CASES);
    }

    if deaths.is_none() {
        let strings = find_strings(&document, &DEATH_LINE);
        deaths = leading_number(&strings, &DEATH_COUNT);
    }

    let Some(cases) = cases else {
        return Err(ScrapeError::MissingCases {
            url: url.to_string(),
        });
    };

    if deaths.is_none() {
        warn!(%url, "Failed to find the number of deaths");
    }

    let conducted = find_strings(&document, &CONDUCTED_LINE);
    let tests_conducted = leading_number(&conducted, &TESTS_CONDUCTED);

    let received = find_strings(&document, &RECEIVED_LINE);
    let (tests_received, tests_pending) = if release_date < *PER_TEST_REPORTING {
        (
            leading_number(&received, &TESTS_RECEIVED),
            leading_number(&received, &TESTS_PENDING),
        )
    } else if release_date == *PER_TEST_REPORTING {
        (tests_conducted, Some(0))
    } else {
        (None, None)
    };

    Ok(CdphRecord {
        release_date,
        release_number,
        cases: Some(cases),
        deaths,
        tests_conducted,
        tests_received,
        tests_pending,
    })
}

fn release_date(url: &str, document: &Html) -> Result<NaiveDate, ScrapeError> {
    let lines = find_strings(document, &DATE_LINE);
    let values = captured_values(&lines, &DATE_VALUE);

    let value = match values.as_slice() {
        [] if lines.is_empty() => {
            return Err(ScrapeError::MissingDate {
                url: url.to_string(),
            });
        }
        [] => {
            return Err(ScrapeError::InvalidDate {
                url: url.to_string(),
                value: lines[0].clone(),
            });
        }
        [value] => value,
        _ => {
            return Err(ScrapeError::AmbiguousDate {
                url: url.to_string(),
                found: values,
            });
        }
    };

    NaiveDate::parse_from_str(value, "%B %d, %Y").map_err(|_| ScrapeError::InvalidDate {
        url: url.to_string(),
        value: value.clone(),
    })
}

fn release_number(url: &str, document: &Html) -> Result<String, ScrapeError> {
    let lines = find_strings(document, &NUMBER_LINE);
    let mut values = captured_values(&lines, &NUMBER_VALUE);

    match values.len() {
        0 => Err(ScrapeError::MissingReleaseNumber {
            url: url.to_string(),
        }),
        1 => Ok(values.remove(0)),
        _ => Err(ScrapeError::AmbiguousReleaseNumber {
            url: url.to_string(),
            found: values,
        }),
    }
}

/// Distinct first captures of `value` across `lines`, in order.
fn captured_values(lines: &[String], value: &Regex) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| value.captures(line))
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .unique()
        .collect()
}

async fn get_text(url: &str) -> Result<String, reqwest::Error> {
    reqwest::get(url).await?.error_for_status()?.text().await
}
