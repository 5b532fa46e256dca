use crate::error::TransformError;
use crate::standardize::{date_partition_keys, parse_date, StandardizedTable, Standardizer};
use crate::types::data_source::{CsvSchema, DataSource, Domain};
use crate::utils::timed;
use log::info;
use polars::prelude::*;
use std::path::Path;

const COL_CRASH_DATE: &str = "crash_date";
const COL_BOROUGH: &str = "borough";
const COL_ZIP_CODE: &str = "zip_code";
const CRASH_DATE_FORMAT: &str = "%m/%d/%Y";
const UNKNOWN_BOROUGH: &str = "UNKNOWN";

impl Standardizer {
    /// Standardizes raw collisions and writes them to silver, partitioned by year and month.
    ///
    /// Rows without a crash date are dropped. Missing boroughs become `"UNKNOWN"`, missing
    /// metrics become 0, and `is_weekend` is true for ISO weekdays 6 and 7.
    pub fn process_collisions(
        &self,
        input: impl Into<DataSource>,
        output_path: &Path,
    ) -> Result<StandardizedTable, TransformError> {
        timed("process_collisions", || {
            info!("Processing collisions (bronze -> silver)...");
            let lf = input
                .into()
                .into_lazy(Domain::Collisions.name(), CsvSchema::Infer, None)?;
            Self::materialize(Domain::Collisions, self.collisions_query(lf), output_path)
        })
    }

    fn collisions_query(&self, lf: LazyFrame) -> LazyFrame {
        let (raw_names, canonical_names): (Vec<&str>, Vec<&str>) = self
            .rename_map
            .iter()
            .map(|(raw, canonical)| (raw.as_str(), canonical.as_str()))
            .unzip();

        // Lenient integer cast: unparseable text falls back to 0 like a missing value
        let metrics: Vec<Expr> = self
            .metric_cols
            .iter()
            .map(|name| {
                col(name.as_str())
                    .cast(DataType::String)
                    .str()
                    .strip_chars(lit(Null {}))
                    .cast(DataType::Float64)
                    .cast(DataType::Int32)
                    .fill_null(lit(0i32))
            })
            .collect();

        lf.rename(raw_names, canonical_names.clone(), true)
            .filter(col(COL_CRASH_DATE).is_not_null())
            .select(canonical_names.into_iter().map(col).collect::<Vec<_>>())
            .with_columns([
                parse_date(COL_CRASH_DATE, CRASH_DATE_FORMAT).alias("date"),
                col(COL_BOROUGH).fill_null(lit(UNKNOWN_BOROUGH)),
                col(COL_ZIP_CODE).cast(DataType::String),
            ])
            .with_columns(metrics)
            // A date that did not parse is as unusable as a missing one
            .filter(col("date").is_not_null())
            .with_columns([col("date").dt().weekday().gt_eq(lit(6)).alias("is_weekend")])
            .with_columns(date_partition_keys())
    }
}
