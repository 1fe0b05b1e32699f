//! File Report Generator
//! Writes the report as a markdown page with CSV tables, JSON chart specs and PNG charts.
//!
//! Layout of the output directory:
//! - `report.md`: every section in order
//! - `tables/NN-title.csv`: full contents of each table
//! - `charts/NN-title.json`: chart spec as handed to the presenter
//! - `charts/NN-title.png`: rendered image, for chart types that support it

use crate::charts::{ChartRenderer, ChartSpec};
use crate::report::{Presenter, ReportError, Severity};
use log::{info, warn};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const REPORT_FILE: &str = "report.md";
const TABLES_DIR: &str = "tables";
const CHARTS_DIR: &str = "charts";

/// Rows shown inline in `report.md`; the CSV always has all of them.
const PREVIEW_ROWS: usize = 20;

/// Presenter that writes everything under one output directory.
pub struct FileReport {
    output_dir: PathBuf,
    chart_size: (u32, u32),
    sections: Vec<String>,
    artifacts: usize,
}

impl FileReport {
    pub fn create(output_dir: &Path, chart_size: (u32, u32)) -> Result<Self, ReportError> {
        fs::create_dir_all(output_dir.join(TABLES_DIR))?;
        fs::create_dir_all(output_dir.join(CHARTS_DIR))?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            chart_size,
            sections: Vec::new(),
            artifacts: 0,
        })
    }

    /// Write `report.md` and return its path.
    pub fn finish(self) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(REPORT_FILE);
        fs::write(&path, self.sections.join("\n\n") + "\n")?;
        info!(
            "report written to {} ({} sections, {} artifacts)",
            path.display(),
            self.sections.len(),
            self.artifacts
        );
        Ok(path)
    }

    fn next_stem(&mut self, title: &str) -> String {
        self.artifacts += 1;
        format!("{:02}-{}", self.artifacts, slugify(title))
    }
}

impl Presenter for FileReport {
    fn text(&mut self, markdown: &str) -> Result<(), ReportError> {
        self.sections.push(markdown.to_string());
        Ok(())
    }

    fn notice(&mut self, severity: Severity, message: &str) -> Result<(), ReportError> {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning | Severity::Error => warn!("{}: {}", severity.label(), message),
        }
        self.sections
            .push(format!("> **{}:** {}", severity.label(), message));
        Ok(())
    }

    fn table(&mut self, title: &str, df: &DataFrame) -> Result<(), ReportError> {
        let stem = self.next_stem(title);
        let relative = format!("{TABLES_DIR}/{stem}.csv");

        let mut file = File::create(self.output_dir.join(&relative))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df.clone())?;

        let mut section = format!(
            "### {}\n\n{} rows x {} columns, full table: [{}]({})\n\n",
            title,
            df.height(),
            df.width(),
            relative,
            relative
        );
        section.push_str(&markdown_table(df, PREVIEW_ROWS)?);
        if df.height() > PREVIEW_ROWS {
            section.push_str(&format!("\n\n_showing first {} rows_", PREVIEW_ROWS));
        }
        self.sections.push(section);
        Ok(())
    }

    fn chart(&mut self, spec: &ChartSpec) -> Result<(), ReportError> {
        let stem = self.next_stem(&spec.title);
        let spec_path = format!("{CHARTS_DIR}/{stem}.json");
        fs::write(
            self.output_dir.join(&spec_path),
            serde_json::to_string_pretty(spec)?,
        )?;

        let mut section = format!("### {}\n\n", spec.title);
        if ChartRenderer::supports(spec) {
            let image_path = format!("{CHARTS_DIR}/{stem}.png");
            match ChartRenderer::render_png(spec, &self.output_dir.join(&image_path), self.chart_size)
            {
                Ok(()) => section.push_str(&format!("![{}]({})\n\n", spec.title, image_path)),
                Err(e) => {
                    warn!("could not render '{}': {}", spec.title, e);
                    section.push_str("_image not available_\n\n");
                }
            }
        }
        section.push_str(&format!(
            "{} chart spec: [{}]({})",
            spec.kind_name(),
            spec_path,
            spec_path
        ));
        self.sections.push(section);
        Ok(())
    }
}

/// Lowercase ASCII words of `title` joined by dashes.
fn slugify(title: &str) -> String {
    let slug = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

fn format_cell(value: AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        // A cell must stay on its table row
        AnyValue::String(s) => s
            .replace('|', "\\|")
            .replace("\r\n", " ")
            .replace(['\n', '\r'], " "),
        AnyValue::Float64(v) => {
            if v.is_finite() && v.fract() == 0.0 {
                format!("{v:.1}")
            } else {
                format!("{v:.3}")
            }
        }
        other => other.to_string(),
    }
}

/// Markdown table of the first `max_rows` rows.
fn markdown_table(df: &DataFrame, max_rows: usize) -> PolarsResult<String> {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut out = format!("| {} |\n", names.join(" | "));
    out.push_str(&format!("|{}\n", " --- |".repeat(names.len())));

    for row in 0..df.height().min(max_rows) {
        let cells = df
            .get_columns()
            .iter()
            .map(|col| col.get(row).map(format_cell))
            .collect::<PolarsResult<Vec<String>>>()?;
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    Ok(out.trim_end().to_string())
}
