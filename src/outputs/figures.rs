//! The CDPH and NYT figures.
//!
//! Each function turns loaded data into a [`Chart`]; rendering and file
//! naming happen in [`write_cdph_figures`] and [`write_nyt_figures`].
//!
//! Daily-change panels plot the first difference against the later of each
//! pair of dates, and their 7-day moving average against the middle day of
//! its window.

use crate::config::{Annotations, NytSettings};
use crate::models::DailyTotals;
use crate::nyt::{NytData, new_cases};
use crate::outputs::charts::{self, Chart, Line, Marker, Panel, series_color};
use crate::series::{diff, interpolate_missing, moving_average};
use crate::store::CdphSeries;
use chrono::NaiveDate;
use plotters::style::{BLACK, RED, RGBColor};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

const WINDOW: usize = 7;
/// Early test counts are too sparse to average.
const TESTS_AVERAGE_SKIP: usize = 10;

/// Bay Area (red) and California (black) shelter-in-place markers.
fn sip_markers(marks: &Annotations, style: fn(NaiveDate, RGBColor) -> Marker) -> [Marker; 2] {
    [style(marks.bay_area_sip, RED), style(marks.california_sip, BLACK)]
}

fn points(dates: &[NaiveDate], values: &[f64]) -> Vec<(NaiveDate, f64)> {
    dates.iter().copied().zip(values.iter().copied()).collect()
}

/// Daily change aligned with the second date of each pair.
fn daily(dates: &[NaiveDate], values: &[f64]) -> Vec<(NaiveDate, f64)> {
    points(dates.get(1..).unwrap_or_default(), &diff(values))
}

/// Centred 7-day average of the daily change, optionally skipping the
/// first `skip` cumulative values.
fn smoothed(values: &[f64], skip: usize) -> Vec<f64> {
    let tail = values.get(skip..).unwrap_or_default();
    moving_average(&diff(tail), WINDOW)
}

fn smoothed_points(dates: &[NaiveDate], values: &[f64], skip: usize) -> Vec<(NaiveDate, f64)> {
    let first = skip + 1 + WINDOW / 2;
    points(dates.get(first..).unwrap_or_default(), &smoothed(values, skip))
}

/// Cases, deaths and their daily changes from the CDPH releases.
pub fn cdph_cases_chart(series: &CdphSeries, marks: &Annotations) -> Chart {
    let markers = sip_markers(marks, Marker::dashed);
    let dates = &series.dates;
    let mut cases = series.cases.clone();
    let mut deaths = series.deaths.clone();
    interpolate_missing(&mut cases);
    interpolate_missing(&mut deaths);

    Chart::new("California (CDPH)", 600, 1000)
        .panel(
            Panel::new("Cases")
                .log()
                .y_min(10.0)
                .line(Line::new(points(dates, &cases), series_color(0)))
                .markers(&markers),
        )
        .panel(
            Panel::new("Deaths")
                .log()
                .y_min(10.0)
                .line(Line::new(points(dates, &deaths), series_color(0)))
                .markers(&markers),
        )
        .panel(
            Panel::new("New Cases")
                .y_min(0.0)
                .line(Line::new(daily(dates, &cases), series_color(0)))
                .line(Line::new(smoothed_points(dates, &cases, 0), BLACK).dotted())
                .markers(&markers),
        )
        .panel(
            Panel::new("Daily Deaths")
                .y_min(0.0)
                .line(Line::new(daily(dates, &deaths), series_color(0)))
                .line(Line::new(smoothed_points(dates, &deaths, 0), BLACK).dotted())
                .markers(&markers),
        )
}

/// Test counts, and new cases against new test results.
///
/// The period before CDPH switched to counting every test is shaded.
pub fn cdph_tests_chart(series: &CdphSeries, marks: &Annotations) -> Chart {
    let markers = sip_markers(marks, Marker::dashed);
    let dates = &series.dates;
    let switch = marks.testing_method_change;

    let mut tests = Panel::new("Tests")
        .y_min(0.0)
        .line(Line::new(points(dates, &series.tests_conducted), series_color(0)).labelled("Conducted"))
        .line(Line::new(points(dates, &series.tests_received), series_color(1)).labelled("Received"))
        .line(Line::new(points(dates, &series.tests_pending), series_color(2)).labelled("Pending"))
        .markers(&markers)
        .with_legend();
    if let Some(first) = dates.first() {
        tests = tests.shade(*first, switch);
    }

    let average = smoothed(&series.tests_received, TESTS_AVERAGE_SKIP);
    let mut versus = Panel::new("New Cases vs New Tests")
        .y_min(0.0)
        .line(Line::new(daily(dates, &series.cases), series_color(0)).labelled("New Cases"))
        .line(Line::new(daily(dates, &series.tests_received), series_color(1)).labelled("New Tests Rcvd"))
        .line(Line::new(smoothed_points(dates, &series.tests_received, TESTS_AVERAGE_SKIP), BLACK).dotted())
        .markers(&markers)
        .with_legend();
    if let Some(second) = dates.get(1) {
        versus = versus.shade(*second, switch);
    }
    let peak = average.iter().copied().filter(|v| v.is_finite()).fold(f64::NAN, f64::max);
    if peak.is_finite() && peak > 0.0 {
        versus = versus.y_max(peak * 1.1);
    }

    Chart::new("California (CDPH)", 600, 800).panel(tests).panel(versus)
}

fn totals_points(series: &[DailyTotals], field: fn(&DailyTotals) -> i64) -> Vec<(NaiveDate, f64)> {
    series.iter().map(|d| (d.date, field(d) as f64)).collect()
}

fn new_case_points(series: &[DailyTotals]) -> Vec<(NaiveDate, f64)> {
    series
        .iter()
        .skip(1)
        .zip(new_cases(series))
        .map(|(d, v)| (d.date, v as f64))
        .collect()
}

/// Cases, deaths and new cases for a set of named regions.
fn regions_chart(title: &str, regions: &[(String, Vec<DailyTotals>)], markers: &[Marker]) -> Chart {
    let mut cases = Panel::new("Cases").log().y_min(10.0);
    let mut deaths = Panel::new("Deaths").log().y_min(10.0);
    let mut fresh = Panel::new("New Cases");

    for (i, (name, series)) in regions.iter().enumerate() {
        let color = series_color(i);
        cases = cases.line(Line::new(totals_points(series, |d| d.cases), color).labelled(name));
        deaths = deaths.line(Line::new(totals_points(series, |d| d.deaths), color).labelled(name));
        fresh = fresh.line(Line::new(new_case_points(series), color).labelled(name).with_dots());
    }

    let finish = |panel: Panel| panel.markers(markers).with_legend();
    Chart::new(title, 600, 1000)
        .panel(finish(cases))
        .panel(finish(deaths))
        .panel(finish(fresh))
}

/// The configured state, the Bay Area counties summed, and each county.
pub fn nyt_california_chart(data: &NytData, settings: &NytSettings, marks: &Annotations) -> Chart {
    let start = Some(settings.start_date);
    let mut regions = vec![
        (settings.state.clone(), data.state(&settings.state, start)),
        (
            "Bay Area".to_string(),
            data.counties_sum(&settings.counties, &settings.state, start),
        ),
    ];
    for county in &settings.counties {
        regions.push((county.clone(), data.county(county, &settings.state, start)));
    }

    let title = format!("{} (NYT)", settings.state);
    regions_chart(&title, &regions, &sip_markers(marks, Marker::solid))
}

/// The United States total and the configured states.
pub fn nyt_states_chart(data: &NytData, settings: &NytSettings, marks: &Annotations) -> Chart {
    let start = Some(settings.start_date);
    let mut regions = vec![("United States".to_string(), data.states_sum(None, start))];
    for state in &settings.states {
        regions.push((state.clone(), data.state(state, start)));
    }

    let markers = [Marker::solid(marks.california_sip, BLACK)];
    let mut chart = regions_chart("United States (NYT)", &regions, &markers);
    for panel in &mut chart.panels {
        if let Some(us) = panel.lines.first_mut() {
            us.color = RED;
        }
        for (i, line) in panel.lines.iter_mut().enumerate().skip(1) {
            line.color = series_color(i - 1);
        }
    }
    chart
}

async fn write_all(plots_path: &Path, charts: Vec<(&str, Chart)>) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    fs::create_dir_all(plots_path).await?;
    let mut written = Vec::new();
    for (file, chart) in charts {
        let path = plots_path.join(file);
        info!(path = %path.display(), "Saving plot");
        charts::render(&chart, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Render both CDPH figures into `plots_path`.
#[instrument(level = "info", skip_all, fields(plots_path = %plots_path.display()))]
pub async fn write_cdph_figures(
    series: &CdphSeries,
    marks: &Annotations,
    plots_path: &Path,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    write_all(
        plots_path,
        vec![
            ("cdph_ca_cases.svg", cdph_cases_chart(series, marks)),
            ("cdph_ca_tests.svg", cdph_tests_chart(series, marks)),
        ],
    )
    .await
}

/// Render both NYT figures into `plots_path`.
#[instrument(level = "info", skip_all, fields(plots_path = %plots_path.display()))]
pub async fn write_nyt_figures(
    data: &NytData,
    settings: &NytSettings,
    marks: &Annotations,
    plots_path: &Path,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    write_all(
        plots_path,
        vec![
            ("nyt_california.svg", nyt_california_chart(data, settings, marks)),
            ("nyt_states.svg", nyt_states_chart(data, settings, marks)),
        ],
    )
    .await
}
