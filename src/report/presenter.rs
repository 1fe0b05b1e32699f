//! Presenter abstraction
//! The surface that prepared views are handed to: tables, text, notices and charts.

use crate::charts::ChartSpec;
use crate::data::ProcessorError;
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Data preparation failed: {0}")]
    Processor(#[from] ProcessorError),
    #[error("Failed to serialize chart: {0}")]
    Json(#[from] serde_json::Error),
}

/// Severity tag of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// Receives the report, section by section, in display order.
pub trait Presenter {
    /// Free-form markdown.
    fn text(&mut self, markdown: &str) -> Result<(), ReportError>;

    fn notice(&mut self, severity: Severity, message: &str) -> Result<(), ReportError>;

    fn table(&mut self, title: &str, df: &DataFrame) -> Result<(), ReportError>;

    fn chart(&mut self, spec: &ChartSpec) -> Result<(), ReportError>;
}
