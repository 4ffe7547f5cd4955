//! SVG rendering of the cumulative stargazer series

use async_trait::async_trait;
use chrono::DateTime;
use plotters::prelude::*;
use stargraph_common::{Result, StarGraphError, TimeSeriesPoint};
use std::ops::Range;
use tracing::{info, instrument};

/// Content type of rendered charts
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml;charset=utf-8";

const DAY_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Renders a cumulative series into image bytes
#[async_trait]
pub trait SeriesRenderer: Send + Sync {
    /// Render `series`; an empty series is an error
    async fn render(&self, series: &[TimeSeriesPoint]) -> Result<Vec<u8>>;

    /// Content type of the produced bytes
    fn content_type(&self) -> &'static str;
}

/// Visual style of the chart
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub line_color: RGBColor,
    pub axis_color: RGBColor,
    pub line_width: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 400,
            line_color: RGBColor(129, 199, 239),
            axis_color: RGBColor(85, 85, 85),
            line_width: 2,
        }
    }
}

impl ChartStyle {
    /// Build a style from `#RRGGBB` colors
    pub fn from_hex(
        width: u32,
        height: u32,
        line_color: &str,
        axis_color: &str,
        line_width: u32,
    ) -> Result<Self> {
        let line_color = parse_color(line_color).ok_or_else(|| {
            StarGraphError::validation_field(format!("Invalid color: {}", line_color), "line_color")
        })?;
        let axis_color = parse_color(axis_color).ok_or_else(|| {
            StarGraphError::validation_field(format!("Invalid color: {}", axis_color), "axis_color")
        })?;

        Ok(Self {
            width,
            height,
            line_color,
            axis_color,
            line_width,
        })
    }
}

/// Parse a color string (hex format) to RGBColor
pub fn parse_color(color_str: &str) -> Option<RGBColor> {
    let hex = color_str.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(RGBColor(r, g, b))
}

/// Line chart of stargazers over time, drawn with the plotters SVG backend
#[derive(Debug, Clone, Default)]
pub struct SvgRenderer {
    style: ChartStyle,
}

impl SvgRenderer {
    pub fn new(style: ChartStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    fn draw(&self, series: &[TimeSeriesPoint]) -> Result<String> {
        if series.is_empty() {
            return Err(StarGraphError::render("Cannot render an empty series"));
        }

        let (x_range, y_range) = axis_ranges(series);
        let axis_style = self.style.axis_color.stroke_width(self.style.line_width);
        let line_style = self.style.line_color.stroke_width(self.style.line_width);
        let format_time = |secs: &f64| format_time_label(*secs);
        let format_count = |count: &f64| format!("{:.0}", count);

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.style.width, self.style.height))
                .into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(x_range, y_range)?;

            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc("Time")
                .y_desc("Stargazers")
                .axis_style(axis_style)
                .label_style(("sans-serif", 12).into_font().color(&self.style.axis_color))
                .x_labels(6)
                .y_labels(6)
                .x_label_formatter(&format_time)
                .y_label_formatter(&format_count)
                .draw()?;

            chart.draw_series(LineSeries::new(
                series.iter().map(|point| {
                    (
                        point.timestamp.timestamp() as f64,
                        point.cumulative_count as f64,
                    )
                }),
                line_style,
            ))?;

            root.present()?;
        }

        Ok(svg)
    }
}

#[async_trait]
impl SeriesRenderer for SvgRenderer {
    #[instrument(skip(self, series), fields(points = series.len()))]
    async fn render(&self, series: &[TimeSeriesPoint]) -> Result<Vec<u8>> {
        let svg = self.draw(series)?;
        info!("Rendered chart with {} points ({} bytes)", series.len(), svg.len());
        Ok(svg.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        SVG_CONTENT_TYPE
    }
}

/// Time axis in unix seconds and count axis from zero, padded so a
/// series with a single instant or a flat count still has a visible extent
fn axis_ranges(series: &[TimeSeriesPoint]) -> (Range<f64>, Range<f64>) {
    let seconds = series.iter().map(|point| point.timestamp.timestamp() as f64);
    let min_x = seconds.clone().fold(f64::INFINITY, f64::min);
    let max_x = seconds.fold(f64::NEG_INFINITY, f64::max);
    let (min_x, max_x) = if max_x - min_x < 1.0 {
        (min_x - DAY_SECS, max_x + DAY_SECS)
    } else {
        (min_x, max_x)
    };

    let max_count = series
        .iter()
        .map(|point| point.cumulative_count)
        .max()
        .unwrap_or(0) as f64;

    (min_x..max_x, 0.0..(max_count * 1.05).max(1.0))
}

fn format_time_label(secs: f64) -> String {
    DateTime::from_timestamp(secs.round() as i64, 0)
        .map(|time| time.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
