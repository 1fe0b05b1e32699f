//! Report Configuration
//! Dataset location, derived-view parameters and presentation strings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::year_labels;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one report run. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub dataset: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub id_column: String,
    pub first_year: u16,
    pub last_year: u16,
    pub target_year: String,
    pub threshold: f64,
    pub top_k: usize,
    pub head_rows: usize,
    pub histogram_bins: usize,
    pub chart_width: u32,
    pub chart_height: u32,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dataset: "pm25".to_string(),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("report"),
            id_column: "Country Name".to_string(),
            first_year: 2010,
            last_year: 2017,
            target_year: "2017".to_string(),
            threshold: 30.0,
            top_k: 5,
            head_rows: 10,
            histogram_bins: 30,
            chart_width: 1000,
            chart_height: 600,
            title: "PM2.5 Global Pollution Dashboard".to_string(),
            subtitle: String::new(),
            description: "Explore PM2.5 pollution levels globally from 2010 to 2017.".to_string(),
            author: String::new(),
        }
    }
}

impl ReportConfig {
    /// Read a JSON config file; missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.first_year > self.last_year {
            return Err(ConfigError::Invalid(format!(
                "first_year {} is after last_year {}",
                self.first_year, self.last_year
            )));
        }
        // Only the listed years are coerced to numbers
        if !self.year_columns().contains(&self.target_year) {
            return Err(ConfigError::Invalid(format!(
                "target_year {} is outside {}..={}",
                self.target_year, self.first_year, self.last_year
            )));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::Invalid("threshold must be a finite number".to_string()));
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram_bins must be greater than 0".to_string(),
            ));
        }
        if self.chart_width == 0 || self.chart_height == 0 {
            return Err(ConfigError::Invalid(
                "chart dimensions must be greater than 0".to_string(),
            ));
        }
        if self.id_column.trim().is_empty() {
            return Err(ConfigError::Invalid("id_column must not be empty".to_string()));
        }
        Ok(())
    }

    /// The fixed list of year column labels, in chronological order.
    pub fn year_columns(&self) -> Vec<String> {
        year_labels(self.first_year, self.last_year)
    }
}
