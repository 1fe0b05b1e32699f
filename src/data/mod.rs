//! Data module - dataset loading, cleaning and derived views

mod loader;
mod processor;

pub use loader::{CsvDirectorySource, DatasetSource, LoaderError};
pub use processor::{
    normalize_column_name, year_labels, DataPreparer, Prepared, ProcessorError, VALUE_FIELD,
    YEAR_FIELD,
};
