//! Static Chart Renderer
//! Draws line and histogram chart specs to PNG with plotters.
//!
//! Choropleth maps need country geometry, which lives with the external
//! dashboard; those specs are only exported, never drawn here.

use crate::charts::{ChartKind, ChartSpec, HistogramBin, LineSeries};
use log::debug;
use plotters::prelude::*;
use std::error::Error;
use std::path::Path;
use thiserror::Error;

/// Qualitative palette for line series (ColorBrewer Set1).
pub const PALETTE: [RGBColor; 9] = [
    RGBColor(228, 26, 28),   // Red
    RGBColor(55, 126, 184),  // Blue
    RGBColor(77, 175, 74),   // Green
    RGBColor(152, 78, 163),  // Purple
    RGBColor(255, 127, 0),   // Orange
    RGBColor(255, 255, 51),  // Yellow
    RGBColor(166, 86, 40),   // Brown
    RGBColor(247, 129, 191), // Pink
    RGBColor(153, 153, 153), // Grey
];

const HISTOGRAM_COLOR: RGBColor = RGBColor(155, 89, 182);
const FONT: &str = "sans-serif";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{0} charts cannot be rendered to an image")]
    Unsupported(&'static str),
    #[error("Chart '{0}' has no data to draw")]
    NoData(String),
    #[error("Drawing failed: {0}")]
    Plot(String),
}

pub struct ChartRenderer;

impl ChartRenderer {
    pub fn supports(spec: &ChartSpec) -> bool {
        !matches!(spec.kind, ChartKind::Choropleth { .. })
    }

    /// Render `spec` as a PNG of `size` pixels at `path`.
    pub fn render_png(spec: &ChartSpec, path: &Path, size: (u32, u32)) -> Result<(), RenderError> {
        let drawn = match &spec.kind {
            ChartKind::Line {
                x_label,
                y_label,
                series,
                markers,
                ..
            } => {
                if series.iter().all(|s| s.points.iter().all(|p| p.y.is_none())) {
                    return Err(RenderError::NoData(spec.title.clone()));
                }
                Self::draw_line_chart(&spec.title, x_label, y_label, series, *markers, path, size)
            }
            ChartKind::Histogram { x_label, bins } => {
                if bins.is_empty() {
                    return Err(RenderError::NoData(spec.title.clone()));
                }
                Self::draw_histogram(&spec.title, x_label, bins, path, size)
            }
            ChartKind::Choropleth { .. } => return Err(RenderError::Unsupported(spec.kind_name())),
        };
        drawn.map_err(|e| RenderError::Plot(e.to_string()))?;

        debug!("rendered {} chart to {}", spec.kind_name(), path.display());
        Ok(())
    }

    /// Distinct x labels in order of first appearance across all series.
    fn categories(series: &[LineSeries]) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for point in series.iter().flat_map(|s| &s.points) {
            if !labels.contains(&point.x) {
                labels.push(point.x.clone());
            }
        }
        labels
    }

    fn get_y_range(series: &[LineSeries]) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for y in series.iter().flat_map(|s| &s.points).filter_map(|p| p.y) {
            min = min.min(y);
            max = max.max(y);
        }
        if min.is_infinite() {
            return (0.0, 100.0);
        }
        let pad = ((max - min) * 0.15).max(1.0);
        ((min - pad).floor(), (max + pad).ceil())
    }

    /// Contiguous runs of present points; missing values break the line.
    /// Runs of a single point are left to the markers.
    fn line_runs(points: &[(f64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
        points
            .split(|(_, y)| y.is_none())
            .filter(|run| run.len() > 1)
            .map(|run| run.iter().filter_map(|&(x, y)| y.map(|y| (x, y))).collect())
            .collect()
    }

    /// X extent of the bins, widened around a single constant-value bin.
    fn histogram_x_range(bins: &[HistogramBin]) -> (f64, f64) {
        let x_min = bins.first().map(|b| b.lower).unwrap_or(0.0);
        let x_max = bins.last().map(|b| b.upper).unwrap_or(1.0);
        if x_min == x_max {
            (x_min - 0.5, x_max + 0.5)
        } else {
            (x_min, x_max)
        }
    }

    fn draw_line_chart(
        title: &str,
        x_label: &str,
        y_label: &str,
        series: &[LineSeries],
        markers: bool,
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), Box<dyn Error>> {
        let labels = Self::categories(series);
        let (y_min, y_max) = Self::get_y_range(series);
        let x_max = labels.len().saturating_sub(1).max(1) as f64;

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.25f64..x_max + 0.25, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_labels(labels.len().max(2))
            .x_label_formatter(&|x: &f64| {
                let i = x.round();
                if (x - i).abs() < 1e-6 && i >= 0.0 {
                    labels.get(i as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .x_desc(x_label)
            .y_desc(y_label)
            .draw()?;

        for (i, s) in series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<(f64, Option<f64>)> = s
                .points
                .iter()
                .map(|p| {
                    let x = labels.iter().position(|l| l == &p.x).unwrap_or(0);
                    (x as f64, p.y)
                })
                .collect();

            for run in Self::line_runs(&points) {
                chart.draw_series(plotters::series::LineSeries::new(
                    run,
                    color.stroke_width(2),
                ))?;
            }

            let present: Vec<(f64, f64)> = points
                .iter()
                .filter_map(|&(x, y)| y.map(|y| (x, y)))
                .collect();
            let radius = if markers { 4 } else { 0 };
            chart
                .draw_series(
                    present
                        .into_iter()
                        .map(move |p| Circle::new(p, radius, color.filled())),
                )?
                .label(s.name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }

    fn draw_histogram(
        title: &str,
        x_label: &str,
        bins: &[HistogramBin],
        path: &Path,
        size: (u32, u32),
    ) -> Result<(), Box<dyn Error>> {
        let (x_min, x_max) = Self::histogram_x_range(bins);
        let top = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
        let y_max = (top * 1.1).ceil().max(1.0);

        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(x_label)
            .y_desc("count")
            .draw()?;

        let single = bins.len() == 1;
        chart.draw_series(bins.iter().map(|b| {
            let (lower, upper) = if single { (x_min, x_max) } else { (b.lower, b.upper) };
            Rectangle::new(
                [(lower, 0.0), (upper, b.count as f64)],
                HISTOGRAM_COLOR.mix(0.8).filled(),
            )
        }))?;

        root.present()?;
        Ok(())
    }
}
