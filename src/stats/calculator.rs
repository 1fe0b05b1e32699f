//! Statistics Calculator Module
//! Descriptive statistics for each year column of the cleaned dataset.

use polars::prelude::*;
use rayon::prelude::*;

/// Statistics for a single year column.
#[derive(Debug, Clone)]
pub struct YearStats {
    pub year: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for YearStats {
    fn default() -> Self {
        Self {
            year: String::new(),
            count: 0,
            missing: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> YearStats {
        let n = values.len();
        if n == 0 {
            return YearStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        YearStats {
            year: String::new(),
            count: n,
            missing: 0,
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[n - 1],
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Non-missing values of a column, cast to f64.
    pub fn column_values(df: &DataFrame, column: &str) -> Vec<f64> {
        df.column(column)
            .ok()
            .and_then(|col| col.cast(&DataType::Float64).ok())
            .map(|col| {
                col.f64()
                    .ok()
                    .map(|ca| ca.into_iter().flatten().filter(|v| v.is_finite()).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Statistics for every year column present, in the given order.
    pub fn compute_year_stats_parallel(df: &DataFrame, year_cols: &[String]) -> Vec<YearStats> {
        let present: Vec<&String> = year_cols
            .iter()
            .filter(|y| df.get_column_index(y).is_some())
            .collect();

        // Use rayon for parallel computation; collect keeps input order
        present
            .par_iter()
            .map(|year| {
                let values = Self::column_values(df, year);
                let mut stats = Self::compute_descriptive_stats(&values);
                stats.year = (*year).clone();
                stats.missing = df.height() - values.len();
                stats
            })
            .collect()
    }

    /// Lay the per-year statistics out as a table, one row per year.
    pub fn summary_table(stats: &[YearStats]) -> PolarsResult<DataFrame> {
        let column = |name: &str, f: fn(&YearStats) -> f64| {
            Column::new(name.into(), stats.iter().map(f).collect::<Vec<f64>>())
        };

        DataFrame::new(vec![
            Column::new(
                "year".into(),
                stats.iter().map(|s| s.year.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                "count".into(),
                stats.iter().map(|s| s.count as u64).collect::<Vec<u64>>(),
            ),
            Column::new(
                "missing".into(),
                stats.iter().map(|s| s.missing as u64).collect::<Vec<u64>>(),
            ),
            column("mean", |s| s.mean),
            column("median", |s| s.median),
            column("std", |s| s.std),
            column("min", |s| s.min),
            column("max", |s| s.max),
            column("p05", |s| s.p05),
            column("p95", |s| s.p95),
        ])
    }
}
