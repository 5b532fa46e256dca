//! Defines the inputs a transform can be fed with and the domains the pipeline knows about.

use crate::error::TransformError;
use crate::storage::scan_partitioned;
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// One of the three standardized tables produced by the silver layer.
///
/// The domain decides which partition keys a table is persisted under and
/// how it is named in log lines and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// NYC motor vehicle collisions, one row per crash.
    Collisions,
    /// Public holidays for the configured country, one row per holiday.
    Holidays,
    /// NOAA GHCN-Daily observations for a single station, one row per day.
    Weather,
}

impl Domain {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Domain::Collisions => "collisions",
            Domain::Holidays => "holidays",
            Domain::Weather => "weather",
        }
    }

    /// Columns the persisted table is split on, outermost directory first.
    pub fn partition_keys(&self) -> &'static [&'static str] {
        match self {
            Domain::Collisions | Domain::Weather => &["year", "month"],
            Domain::Holidays => &["year"],
        }
    }
}

/// Formats a `Domain` using its lowercase table name.
///
/// # Examples
///
/// ```
/// use collision_etl::Domain;
///
/// assert_eq!(Domain::Weather.to_string(), "weather");
/// ```
impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How a raw CSV file should be typed when it is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvSchema {
    /// Let polars infer column types from the data.
    #[default]
    Infer,
    /// Read every column as text. Typed conversion happens downstream.
    AllText,
}

/// Input of a transform: either a table that is already in memory, or a location on disk.
///
/// In-memory tables are the fast path when stages run in the same process. Paths make
/// every stage re-runnable from whatever a previous run left behind.
///
/// A path may point at
/// * a directory, read as a partitioned parquet dataset (`<dir>/**/*.parquet`),
/// * a `.parquet` file,
/// * a `.csv` file (raw bronze capture),
/// * a `.json` file (raw holiday capture, only accepted where a JSON reader is supplied).
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A materialized table handed over from the previous stage.
    Table(DataFrame),
    /// A file or directory written by a previous stage or a previous run.
    Path(PathBuf),
}

impl From<DataFrame> for DataSource {
    fn from(frame: DataFrame) -> Self {
        DataSource::Table(frame)
    }
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        DataSource::Path(path)
    }
}

impl From<&Path> for DataSource {
    fn from(path: &Path) -> Self {
        DataSource::Path(path.to_path_buf())
    }
}

/// Reader used for `.json` inputs. Only the holiday transform supplies one.
pub(crate) type JsonReader = fn(&Path) -> Result<DataFrame, TransformError>;

impl DataSource {
    /// Normalizes the source into a `LazyFrame`.
    ///
    /// Fails with [`TransformError::UnsupportedInput`] before reading anything when a
    /// path is neither a file nor a directory, or has an extension this table cannot be
    /// read from.
    pub(crate) fn into_lazy(
        self,
        table: &str,
        csv_schema: CsvSchema,
        json_reader: Option<JsonReader>,
    ) -> Result<LazyFrame, TransformError> {
        match self {
            DataSource::Table(df) => {
                log::info!("Input '{}': using in-memory table ({} rows)", table, df.height());
                Ok(df.lazy())
            }
            DataSource::Path(path) if path.is_dir() => {
                log::info!("Input '{}': scanning partitioned dataset at {:?}", table, path);
                scan_partitioned(&path)
            }
            DataSource::Path(path) if path.is_file() => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase());
                match (extension.as_deref(), json_reader) {
                    (Some("csv"), _) => {
                        log::info!("Input '{}': reading raw CSV at {:?}", table, path);
                        scan_raw_csv(&path, csv_schema)
                    }
                    (Some("parquet"), _) => {
                        log::info!("Input '{}': scanning parquet file at {:?}", table, path);
                        LazyFrame::scan_parquet(&path, Default::default())
                            .map_err(|e| TransformError::ParquetScan(path.clone(), e))
                    }
                    (Some("json"), Some(reader)) => {
                        log::info!("Input '{}': reading raw JSON at {:?}", table, path);
                        Ok(reader(&path)?.lazy())
                    }
                    _ => Err(TransformError::UnsupportedInput {
                        table: table.to_string(),
                        path,
                    }),
                }
            }
            DataSource::Path(path) => Err(TransformError::UnsupportedInput {
                table: table.to_string(),
                path,
            }),
        }
    }
}

/// Reads a raw CSV file with permissive parsing.
///
/// Rows with values that fail to parse keep going as nulls instead of aborting the read.
pub(crate) fn read_raw_csv(path: &Path, csv_schema: CsvSchema) -> PolarsResult<DataFrame> {
    let infer_schema_length = match csv_schema {
        CsvSchema::Infer => Some(100),
        CsvSchema::AllText => Some(0),
    };
    // Ragged lines from hand-edited exports are cut instead of failing the file
    let parse_options = CsvParseOptions::default().with_truncate_ragged_lines(true);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_ignore_errors(true)
        .with_infer_schema_length(infer_schema_length)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

fn scan_raw_csv(path: &Path, csv_schema: CsvSchema) -> Result<LazyFrame, TransformError> {
    // Make sure the file is readable up front so the error points at the file
    File::open(path).map_err(|e| TransformError::CsvOpen(path.to_path_buf(), e))?;
    read_raw_csv(path, csv_schema)
        .map(|df| df.lazy())
        .map_err(|e| TransformError::CsvScan(path.to_path_buf(), e))
}
