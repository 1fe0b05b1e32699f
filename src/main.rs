//! PM2.5 Dashboard - command line entry point
//!
//! Loads the dataset, cleans it and writes the report to the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use pm25_dashboard::config::ReportConfig;
use pm25_dashboard::data::{CsvDirectorySource, DataPreparer, DatasetSource};
use pm25_dashboard::report::{render_dashboard, FileReport};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pm25-dashboard")]
#[command(about = "Clean a PM2.5 dataset and write summary tables and charts")]
#[command(version)]
struct Cli {
    /// JSON config file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding `<dataset>.csv`
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Dataset key to load
    #[arg(long)]
    dataset: Option<String>,

    /// Directory the report is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    threshold: Option<f64>,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ReportConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    );
    if cli.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let config = cli.resolve_config()?;
    info!(
        "dataset '{}' from {}, report to {}",
        config.dataset,
        config.data_dir.display(),
        config.output_dir.display()
    );

    let source = CsvDirectorySource::new(&config.data_dir);
    let raw = source
        .load(&config.dataset)
        .with_context(|| format!("loading dataset '{}'", config.dataset))?;
    let cleaned = DataPreparer::prepare(&raw, &config.year_columns())?;

    let mut report = FileReport::create(
        &config.output_dir,
        (config.chart_width, config.chart_height),
    )?;
    render_dashboard(&cleaned, &config, &mut report)?;
    let path = report.finish()?;

    println!("Report written to {}", path.display());
    Ok(())
}
