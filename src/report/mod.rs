//! Report module - Presenter surface, file output and the dashboard flow

mod dashboard;
mod file_report;
mod presenter;

pub use dashboard::render_dashboard;
pub use file_report::FileReport;
pub use presenter::{Presenter, ReportError, Severity};
