//! The silver layer: one transform per raw source, each producing a typed,
//! partitioned table.

pub(crate) mod collisions;
pub(crate) mod holidays;
pub(crate) mod weather;

use crate::config::SilverConfig;
use crate::error::TransformError;
use crate::storage::write_partitioned;
use crate::types::data_source::Domain;
use log::info;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Output of a silver transform: the table itself and the directory it was persisted to.
///
/// Either half can be handed to the next stage as a [`crate::DataSource`].
#[derive(Debug, Clone)]
pub struct StandardizedTable {
    pub domain: Domain,
    pub frame: DataFrame,
    pub path: PathBuf,
}

/// Runs the silver transforms.
///
/// The only state is the collisions column mapping; holidays and weather have a fixed
/// raw layout.
#[derive(Debug, Clone)]
pub struct Standardizer {
    rename_map: BTreeMap<String, String>,
    metric_cols: Vec<String>,
}

impl Standardizer {
    pub fn new(config: &SilverConfig) -> Self {
        Self {
            rename_map: config.collisions.rename_map.clone(),
            metric_cols: config.collisions.metric_cols.clone(),
        }
    }

    /// Collects `lf`, persists it partitioned by the domain's keys and returns both.
    fn materialize(
        domain: Domain,
        lf: LazyFrame,
        output_path: &Path,
    ) -> Result<StandardizedTable, TransformError> {
        let frame = lf.collect().map_err(TransformError::polars(domain.name()))?;

        info!(
            "Persisting {} silver layer ({} rows) to {:?}...",
            domain,
            frame.height(),
            output_path
        );
        write_partitioned(&frame, domain.partition_keys(), output_path)?;

        Ok(StandardizedTable {
            domain,
            frame,
            path: output_path.to_path_buf(),
        })
    }
}

/// Casts any column to `f64` through trimmed text.
///
/// Values that do not parse after trimming become null instead of failing the query.
pub(crate) fn lenient_f64(name: &str) -> Expr {
    col(name)
        .cast(DataType::String)
        .str()
        .strip_chars(lit(Null {}))
        .cast(DataType::Float64)
}

/// Parses a text (or already typed) column into a `Date`, null when it does not match `format`.
pub(crate) fn parse_date(name: &str, format: &str) -> Expr {
    col(name).cast(DataType::String).str().to_date(StrptimeOptions {
        format: Some(format.into()),
        strict: false,
        ..Default::default()
    })
}

/// `year` and `month` partition keys derived from the `date` column.
pub(crate) fn date_partition_keys() -> [Expr; 2] {
    [
        col("date").dt().year().cast(DataType::Int32).alias("year"),
        col("date").dt().month().cast(DataType::Int32).alias("month"),
    ]
}
