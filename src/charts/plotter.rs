//! Chart Plotter Module
//! Builds chart specifications from prepared DataFrames.
//!
//! A [`ChartSpec`] is plain data: it can be serialized for an external
//! dashboard or drawn by [`crate::charts::ChartRenderer`].

use crate::data::{VALUE_FIELD, YEAR_FIELD};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// One point of a line series; `y` is `None` where the value is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: String,
    pub y: Option<f64>,
}

/// A line per entity (one colour per series).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub location: String,
    pub value: f64,
}

/// Half-open bin `[lower, upper)`; the last bin also holds `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartKind {
    Line {
        x_label: String,
        y_label: String,
        color_field: String,
        markers: bool,
        series: Vec<LineSeries>,
    },
    Choropleth {
        location_field: String,
        location_mode: String,
        value_label: String,
        regions: Vec<Region>,
    },
    Histogram {
        x_label: String,
        bins: Vec<HistogramBin>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    #[serde(flatten)]
    pub kind: ChartKind,
}

impl ChartSpec {
    /// Short machine name of the chart type.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ChartKind::Line { .. } => "line",
            ChartKind::Choropleth { .. } => "choropleth",
            ChartKind::Histogram { .. } => "histogram",
        }
    }
}

/// Creates chart specifications from the prepared views.
pub struct ChartPlotter;

impl ChartPlotter {
    /// One series per identifier of a long-form `[id, "year", "value"]` frame.
    ///
    /// Series appear in order of first appearance; points keep row order.
    pub fn line_chart(
        long: &DataFrame,
        id_col: &str,
        title: &str,
        y_label: &str,
    ) -> PolarsResult<ChartSpec> {
        let ids = long.column(id_col)?.str()?;
        let years = long.column(YEAR_FIELD)?.str()?;
        let values = long.column(VALUE_FIELD)?.f64()?;

        let mut series: Vec<LineSeries> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for ((id, year), value) in ids.into_iter().zip(years).zip(values) {
            let (Some(id), Some(year)) = (id, year) else {
                continue;
            };
            let slot = *index.entry(id.to_string()).or_insert_with(|| {
                series.push(LineSeries {
                    name: id.to_string(),
                    points: Vec::new(),
                });
                series.len() - 1
            });
            series[slot].points.push(LinePoint {
                x: year.to_string(),
                y: value,
            });
        }

        Ok(ChartSpec {
            title: title.to_string(),
            kind: ChartKind::Line {
                x_label: "Year".to_string(),
                y_label: y_label.to_string(),
                color_field: id_col.to_string(),
                markers: true,
                series,
            },
        })
    }

    /// Country-name choropleth of `value_col`; rows missing either field are left out.
    pub fn choropleth(
        df: &DataFrame,
        id_col: &str,
        value_col: &str,
        title: &str,
    ) -> PolarsResult<ChartSpec> {
        let ids = df.column(id_col)?.cast(&DataType::String)?;
        let values = df.column(value_col)?.cast(&DataType::Float64)?;

        let regions = ids
            .str()?
            .into_iter()
            .zip(values.f64()?)
            .filter_map(|(id, value)| match (id, value) {
                (Some(id), Some(value)) if !id.trim().is_empty() && value.is_finite() => {
                    Some(Region {
                        location: id.to_string(),
                        value,
                    })
                }
                _ => None,
            })
            .collect();

        Ok(ChartSpec {
            title: title.to_string(),
            kind: ChartKind::Choropleth {
                location_field: id_col.to_string(),
                location_mode: "country names".to_string(),
                value_label: value_col.to_string(),
                regions,
            },
        })
    }

    /// Histogram of the non-missing values of `value_col`.
    pub fn histogram(
        df: &DataFrame,
        value_col: &str,
        bins: usize,
        title: &str,
        x_label: &str,
    ) -> PolarsResult<ChartSpec> {
        let values: Vec<f64> = df
            .column(value_col)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .collect();

        Ok(ChartSpec {
            title: title.to_string(),
            kind: ChartKind::Histogram {
                x_label: x_label.to_string(),
                bins: Self::histogram_bins(&values, bins),
            },
        })
    }

    /// Equal-width bins spanning the range of `values`.
    pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
        if values.is_empty() || bins == 0 {
            return Vec::new();
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            return vec![HistogramBin {
                lower: min,
                upper: max,
                count: values.len(),
            }];
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: if i == bins - 1 {
                    max
                } else {
                    min + (i + 1) as f64 * width
                },
                count,
            })
            .collect()
    }
}
