//! SVG time-series charts.
//!
//! A [`Chart`] is a vertical stack of [`Panel`]s sharing one date axis. Each
//! panel carries its own lines, dashed date markers, an optional shaded date
//! span and a linear or log10 y axis. Rendering goes through the plotters
//! SVG backend.
//!
//! `NaN` values split a line into separate segments, and on log panels
//! non-positive values are dropped, so gaps in the data stay visible.

use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Line colours, cycled by series index.
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

pub fn series_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

/// A series drawn as a polyline.
#[derive(Debug, Clone)]
pub struct Line {
    pub label: Option<String>,
    pub points: Vec<(NaiveDate, f64)>,
    pub color: RGBColor,
    pub dotted: bool,
    /// Draw a dot on every point as well as the line.
    pub dots: bool,
}

/// A vertical line across a panel.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub date: NaiveDate,
    pub color: RGBColor,
    pub solid: bool,
}

impl Marker {
    pub fn dashed(date: NaiveDate, color: RGBColor) -> Self {
        Self {
            date,
            color,
            solid: false,
        }
    }

    pub fn solid(date: NaiveDate, color: RGBColor) -> Self {
        Self {
            date,
            color,
            solid: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub scale: Scale,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub lines: Vec<Line>,
    pub markers: Vec<Marker>,
    pub shade: Option<(NaiveDate, NaiveDate)>,
    pub legend: bool,
}

#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub panels: Vec<Panel>,
}

impl Line {
    pub fn new(points: Vec<(NaiveDate, f64)>, color: RGBColor) -> Self {
        Self {
            label: None,
            points,
            color,
            dotted: false,
            dots: false,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn dotted(mut self) -> Self {
        self.dotted = true;
        self
    }

    pub fn with_dots(mut self) -> Self {
        self.dots = true;
        self
    }
}

impl Panel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scale: Scale::Linear,
            y_min: None,
            y_max: None,
            lines: Vec::new(),
            markers: Vec::new(),
            shade: None,
            legend: false,
        }
    }

    pub fn log(mut self) -> Self {
        self.scale = Scale::Log;
        self
    }

    pub fn y_min(mut self, value: f64) -> Self {
        self.y_min = Some(value);
        self
    }

    pub fn y_max(mut self, value: f64) -> Self {
        self.y_max = Some(value);
        self
    }

    pub fn line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    pub fn markers(mut self, markers: &[Marker]) -> Self {
        self.markers.extend_from_slice(markers);
        self
    }

    pub fn shade(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.shade = Some((from, to));
        self
    }

    pub fn with_legend(mut self) -> Self {
        self.legend = true;
        self
    }

    fn project(&self, value: f64) -> Option<f64> {
        let projected = match self.scale {
            Scale::Linear => value,
            Scale::Log if value > 0.0 => value.log10(),
            Scale::Log => return None,
        };
        projected.is_finite().then_some(projected)
    }

    /// Y range in projected (possibly log10) units.
    fn y_bounds(&self) -> Range<f64> {
        let values: Vec<f64> = self
            .lines
            .iter()
            .flat_map(|line| line.points.iter())
            .filter_map(|(_, v)| self.project(*v))
            .collect();

        let data_min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let data_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (data_min, data_max) = if values.is_empty() {
            (0.0, 1.0)
        } else {
            (data_min, data_max)
        };

        let low = self.y_min.and_then(|v| self.project(v)).unwrap_or(data_min);
        let high = match self.y_max.and_then(|v| self.project(v)) {
            Some(high) => high,
            None if values.is_empty() => data_max,
            None => data_max + (data_max - low).abs() * 0.05,
        };

        if high > low { low..high } else { low..low + 1.0 }
    }

    /// Finite projected points, split wherever a value is missing.
    fn segments(&self, line: &Line) -> Vec<Vec<(NaiveDate, f64)>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (date, value) in &line.points {
            match self.project(*value) {
                Some(y) => current.push((*date, y)),
                None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

impl Chart {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            panels: Vec::new(),
        }
    }

    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    /// Shared x range covering every point of every panel.
    fn date_range(&self) -> Option<Range<NaiveDate>> {
        let dates = self
            .panels
            .iter()
            .flat_map(|panel| panel.lines.iter())
            .flat_map(|line| line.points.iter().map(|(date, _)| *date));

        let (first, last) = dates.fold(None::<(NaiveDate, NaiveDate)>, |bounds, date| match bounds {
            None => Some((date, date)),
            Some((lo, hi)) => Some((date.min(lo), date.max(hi))),
        })?;

        let last = if last > first { last } else { first + Duration::days(1) };
        Some(first..last)
    }
}

/// Render `chart` to an SVG file at `path`.
///
/// # Errors
///
/// Returns an error if the chart has no data points or the file cannot be
/// written.
#[instrument(level = "info", skip_all, fields(path = %path.display(), title = %chart.title))]
pub fn render(chart: &Chart, path: &Path) -> Result<(), Box<dyn Error>> {
    let range = chart.date_range().ok_or("chart has no data points")?;

    let root = SVGBackend::new(path, (chart.width, chart.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&chart.title, ("sans-serif", 22))?;

    let areas = root.split_evenly((chart.panels.len().max(1), 1));
    for (panel, area) in chart.panels.iter().zip(areas.iter()) {
        draw_panel(panel, area, range.clone())?;
    }

    root.present()?;
    info!("Saved plot");
    Ok(())
}

fn draw_panel(
    panel: &Panel,
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    x_range: Range<NaiveDate>,
) -> Result<(), Box<dyn Error>> {
    let y_range = panel.y_bounds();
    debug!(panel = %panel.title, ?y_range, "Drawing panel");

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 15))
        .margin(6)
        .x_label_area_size(24)
        .y_label_area_size(52)
        .build_cartesian_2d(x_range.clone(), y_range.clone())?;

    let scale = panel.scale;
    let date_label = |date: &NaiveDate| date.format("%m-%d").to_string();
    let value_label = |value: &f64| axis_label(*value, scale);
    chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&date_label)
        .y_label_formatter(&value_label)
        .draw()?;

    if let Some((from, to)) = panel.shade {
        let from = from.clamp(x_range.start, x_range.end);
        let to = to.clamp(x_range.start, x_range.end);
        if to > from {
            chart.draw_series(std::iter::once(Rectangle::new(
                [(from, y_range.start), (to, y_range.end)],
                BLACK.mix(0.1).filled(),
            )))?;
        }
    }

    for marker in &panel.markers {
        if marker.date < x_range.start || marker.date > x_range.end {
            continue;
        }
        let ends = vec![(marker.date, y_range.start), (marker.date, y_range.end)];
        if marker.solid {
            chart.draw_series(LineSeries::new(ends, marker.color.stroke_width(1)))?;
        } else {
            chart.draw_series(DashedLineSeries::new(ends, 5, 4, marker.color.stroke_width(1)))?;
        }
    }

    for line in &panel.lines {
        for (i, segment) in panel.segments(line).into_iter().enumerate() {
            if line.dots {
                let style = line.color.filled();
                chart.draw_series(segment.iter().map(|point| Circle::new(*point, 2, style)))?;
            }
            let annotation = if line.dotted {
                chart.draw_series(DashedLineSeries::new(segment, 2, 3, line.color.stroke_width(1)))?
            } else {
                chart.draw_series(LineSeries::new(segment, line.color.stroke_width(2)))?
            };

            if let (0, Some(label)) = (i, &line.label) {
                let color = line.color;
                annotation
                    .label(label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
            }
        }
    }

    if panel.legend && panel.lines.iter().any(|line| line.label.is_some()) {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font(("sans-serif", 11))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.4))
            .draw()?;
    }

    Ok(())
}

/// Tick label for a projected axis value.
fn axis_label(value: f64, scale: Scale) -> String {
    match scale {
        Scale::Linear => compact(value),
        Scale::Log => compact(10f64.powf(value)),
    }
}

/// `1234567` → `1.2M`, `45000` → `45k`, `12.5` → `12`.
fn compact(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if magnitude >= 1e4 {
        format!("{:.0}k", value / 1e3)
    } else if magnitude >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else {
        format!("{value:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn points(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (ymd(2020, 3, 1) + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_segments_split_on_nan() {
        let panel = Panel::new("Cases");
        let line = Line::new(points(&[1.0, 2.0, f64::NAN, 4.0, 5.0]), series_color(0));
        let segments = panel.segments(&line);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1][1].1, 5.0);
    }

    #[test]
    fn test_log_panel_drops_non_positive_and_projects() {
        let panel = Panel::new("Deaths").log();
        let line = Line::new(points(&[0.0, 10.0, 1000.0]), series_color(1));
        let segments = panel.segments(&line);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[0][0].0, ymd(2020, 3, 2));
        assert!((segments[0][0].1 - 1.0).abs() < 1e-9);
        assert!((segments[0][1].1 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_y_bounds_respect_floor_and_ceiling() {
        let panel = Panel::new("New Cases")
            .y_min(0.0)
            .line(Line::new(points(&[5.0, 15.0, 10.0]), series_color(0)));
        let bounds = panel.y_bounds();
        assert_eq!(bounds.start, 0.0);
        assert!(bounds.end > 15.0);

        let capped = panel.clone().y_max(12.0);
        assert_eq!(capped.y_bounds(), 0.0..12.0);

        let log = Panel::new("Cases")
            .log()
            .y_min(10.0)
            .line(Line::new(points(&[100.0, 1000.0]), series_color(0)));
        assert!((log.y_bounds().start - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_y_bounds_without_data() {
        assert_eq!(Panel::new("Empty").y_bounds(), 0.0..1.0);
        assert_eq!(Panel::new("Empty").y_min(0.0).y_bounds(), 0.0..1.0);
        assert_eq!(Panel::new("Empty").y_max(5.0).y_bounds(), 0.0..5.0);
    }

    #[test]
    fn test_y_bounds_headroom_only_with_data() {
        let panel = Panel::new("New Cases").line(Line::new(points(&[0.0, 10.0]), series_color(0)));
        let bounds = panel.y_bounds();
        assert_eq!(bounds.start, 0.0);
        assert!((bounds.end - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_date_range_spans_all_panels() {
        let chart = Chart::new("t", 100, 100)
            .panel(Panel::new("a").line(Line::new(points(&[1.0, 2.0]), series_color(0))))
            .panel(Panel::new("b").line(Line::new(points(&[1.0, 2.0, 3.0, 4.0]), series_color(0))));
        assert_eq!(chart.date_range(), Some(ymd(2020, 3, 1)..ymd(2020, 3, 4)));
        assert_eq!(Chart::new("empty", 100, 100).date_range(), None);
    }

    #[test]
    fn test_compact_labels() {
        assert_eq!(compact(1_234_567.0), "1.2M");
        assert_eq!(compact(45_000.0), "45k");
        assert_eq!(compact(2_500.0), "2.5k");
        assert_eq!(compact(12.0), "12");
        assert_eq!(axis_label(12.0, Scale::Linear), "12");
    }

    #[test]
    fn test_render_writes_svg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.svg");
        let chart = Chart::new("California (CDPH)", 600, 400)
            .panel(
                Panel::new("Cases")
                    .log()
                    .y_min(10.0)
                    .line(Line::new(points(&[20.0, 40.0, f64::NAN, 90.0]), series_color(0)).labelled("Cases"))
                    .markers(&[Marker::dashed(ymd(2020, 3, 2), RED), Marker::solid(ymd(2020, 3, 3), BLACK)])
                    .shade(ymd(2020, 3, 1), ymd(2020, 3, 3))
                    .with_legend(),
            )
            .panel(
                Panel::new("New Cases")
                    .y_min(0.0)
                    .line(Line::new(points(&[1.0, 2.0, 3.0]), series_color(1)).dotted())
                    .line(Line::new(points(&[2.0, 1.0, 4.0]), series_color(2)).with_dots()),
            );

        render(&chart, &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("New Cases"));
    }

    #[test]
    fn test_render_empty_chart_is_error() {
        let dir = TempDir::new().unwrap();
        let chart = Chart::new("Empty", 100, 100).panel(Panel::new("none"));
        assert!(render(&chart, &dir.path().join("empty.svg")).is_err());
    }
}
