//! Lightweight data quality checks run on every raw capture.

use crate::error::TransformError;
use log::{info, warn};
use polars::prelude::DataFrame;

/// Checks that `df` has rows and that its critical columns are populated.
///
/// An empty table is fatal. A critical column that is missing or contains nulls is only
/// reported as a warning; no row is dropped here.
pub fn validate_frame(
    df: &DataFrame,
    name: &str,
    critical_cols: &[&str],
) -> Result<(), TransformError> {
    info!("Running data quality check for '{}'...", name);

    if df.height() == 0 {
        return Err(TransformError::EmptyInput(name.to_string()));
    }

    for col_name in critical_cols {
        match df.column(col_name) {
            Ok(column) => {
                let null_count = column.null_count();
                if null_count > 0 {
                    warn!(
                        "DQ warning: column '{}' in '{}' has {} nulls",
                        col_name, name, null_count
                    );
                }
            }
            Err(_) => warn!(
                "Skipping null check for missing column '{}' in '{}'",
                col_name, name
            ),
        }
    }

    info!("DQ check passed for '{}'. Rows: {}", name, df.height());
    Ok(())
}
