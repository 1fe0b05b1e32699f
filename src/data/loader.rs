//! Dataset Loader Module
//! Resolves a dataset key to a raw DataFrame using Polars.

use log::{debug, info};
use polars::prelude::*;
#[cfg(test)]
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Dataset '{key}' not found at {}", path.display())]
    NotFound { key: String, path: PathBuf },
    #[cfg(test)]
    #[error("Dataset '{0}' is not registered")]
    UnknownKey(String),
}

/// Supplies raw datasets by name.
pub trait DatasetSource {
    fn load(&self, key: &str) -> Result<DataFrame, LoaderError>;
}

/// Loads `<root>/<key>.csv` with every column read as a string.
///
/// Cells are kept raw so that numeric coercion happens in one place
/// ([`crate::data::DataPreparer::coerce_numeric`]) instead of inside the
/// CSV schema inference.
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path the given key resolves to.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.csv"))
    }

    fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        // A schema inference length of zero makes every column a String
        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;
        Ok(df)
    }
}

impl DatasetSource for CsvDirectorySource {
    fn load(&self, key: &str) -> Result<DataFrame, LoaderError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(LoaderError::NotFound {
                key: key.to_string(),
                path,
            });
        }

        debug!("reading dataset '{}' from {}", key, path.display());
        let df = Self::read_csv(&path)?;
        info!(
            "loaded dataset '{}': {} rows x {} columns",
            key,
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// Keeps datasets in memory, keyed by name.
#[cfg(test)]
#[derive(Default)]
pub struct InMemorySource {
    datasets: HashMap<String, DataFrame>,
}

#[cfg(test)]
impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, df: DataFrame) {
        self.datasets.insert(key.into(), df);
    }
}

#[cfg(test)]
impl DatasetSource for InMemorySource {
    fn load(&self, key: &str) -> Result<DataFrame, LoaderError> {
        self.datasets
            .get(key)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownKey(key.to_string()))
    }
}
