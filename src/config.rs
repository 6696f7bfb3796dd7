//! Settings file handling.
//!
//! All settings are optional; an absent file or an absent key falls back to
//! the dates and regions the charts are drawn with by default. A partial
//! `config.yaml` looks like:
//!
//! ```yaml
//! nyt:
//!   start_date: 2020-03-01
//!   states: [California, Texas]
//! annotations:
//!   california_sip: 2020-03-19
//! ```

use chrono::NaiveDate;
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

/// Top-level settings, one section per concern.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub cdph: CdphSettings,
    pub annotations: Annotations,
    pub nyt: NytSettings,
}

/// Where CDPH press releases are indexed and how they are recognised.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CdphSettings {
    pub base_url: String,
    pub news_release_path: String,
    /// Text that marks a link on the index page as a COVID-19 release.
    pub link_text: String,
}

/// Dates drawn as markers on every chart.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Annotations {
    pub bay_area_sip: NaiveDate,
    pub california_sip: NaiveDate,
    /// Last day CDPH counted persons tested rather than tests conducted.
    pub testing_method_change: NaiveDate,
}

/// Regions plotted from the NYT feeds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NytSettings {
    pub start_date: NaiveDate,
    pub state: String,
    pub counties: Vec<String>,
    pub states: Vec<String>,
}

impl Default for CdphSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.cdph.ca.gov".to_string(),
            news_release_path: "/Programs/OPA/Pages/New-Release-2020.aspx".to_string(),
            link_text: "Latest COVID-19 Facts".to_string(),
        }
    }
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bay_area_sip: ymd(2020, 3, 17),
            california_sip: ymd(2020, 3, 20),
            testing_method_change: ymd(2020, 4, 22),
        }
    }
}

impl Default for NytSettings {
    fn default() -> Self {
        let counties = [
            "Alameda",
            "Contra Costa",
            "Marin",
            "Napa",
            "San Francisco",
            "San Mateo",
            "Santa Clara",
            "Solano",
            "Sonoma",
        ];
        let states = ["California", "New York", "New Jersey", "Washington"];
        Self {
            start_date: ymd(2020, 2, 22),
            state: "California".to_string(),
            counties: counties.iter().map(|c| c.to_string()).collect(),
            states: states.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

impl CdphSettings {
    /// Absolute URL of the press-release index page.
    pub fn news_release_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)?.join(&self.news_release_path)
    }
}

impl Settings {
    /// Load settings from `path`, or return the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for
    /// these settings.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}
