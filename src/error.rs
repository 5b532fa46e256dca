use crate::extraction::error::ExtractionError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Failed to read config file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_yaml::Error),

    #[error("Failed to create directory '{0}'")]
    DirectoryCreation(PathBuf, #[source] std::io::Error),

    #[error("Transform task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Errors raised while standardizing, enriching, aggregating or persisting tables.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Unsupported input for '{table}': {path:?} is not a readable file or dataset directory")]
    UnsupportedInput { table: String, path: PathBuf },

    #[error("Data quality error: input for '{0}' is empty")]
    EmptyInput(String),

    #[error("No parquet files found under '{0}'")]
    NoParquetFiles(PathBuf),

    #[error("Failed to list dataset directory '{0}'")]
    DatasetListing(PathBuf, #[source] std::io::Error),

    #[error("Failed to scan parquet file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("I/O error writing parquet file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing parquet file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to open CSV file '{0}'")]
    CsvOpen(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse CSV file '{0}'")]
    CsvScan(PathBuf, #[source] PolarsError),

    #[error("I/O error writing CSV file '{0}'")]
    CsvWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing CSV file '{0}'")]
    CsvWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to read JSON file '{0}'")]
    JsonRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse JSON file '{0}'")]
    JsonParse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to prepare output directory '{0}'")]
    OutputDirectory(PathBuf, #[source] std::io::Error),

    #[error("Polars operation failed for table {table}: {source}")]
    Polars {
        table: String,
        #[source]
        source: PolarsError,
    },
}

impl TransformError {
    pub(crate) fn polars(table: impl Into<String>) -> impl FnOnce(PolarsError) -> Self {
        let table = table.into();
        move |source| TransformError::Polars { table, source }
    }
}

/// Lets `?` work on polars calls in tests and helpers that have no table name at hand.
impl From<PolarsError> for TransformError {
    fn from(source: PolarsError) -> Self {
        TransformError::Polars {
            table: "<unnamed>".to_string(),
            source,
        }
    }
}
