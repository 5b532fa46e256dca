//! Joins standardized collisions with same-day holiday and weather context.

use crate::error::TransformError;
use crate::standardize::weather::weather_cutoff;
use crate::types::data_source::{CsvSchema, DataSource};
use crate::utils::timed;
use log::info;
use polars::prelude::*;

pub(crate) const NON_HOLIDAY: &str = "Non-Holiday";

/// Holiday types grouped by how much they are expected to change traffic.
const HIGH_IMPACT_TYPES: [&str; 2] = ["Public", "Bank"];
const PARTIAL_IMPACT_TYPES: [&str; 2] = ["School", "Authorities"];
const LOW_IMPACT_TYPES: [&str; 2] = ["Optional", "Observance"];

/// Produces one row per collision dated on or after 2020-01-01, with the holiday and
/// weather of its day attached.
///
/// Both joins are left joins on `date`. A day without a holiday is named `"Non-Holiday"`
/// and has every impact flag false. A day without weather has false weather flags and
/// null `max_temp`/`min_temp`.
pub fn enrich_collisions(
    collisions: impl Into<DataSource>,
    holidays: impl Into<DataSource>,
    weather: impl Into<DataSource>,
) -> Result<DataFrame, TransformError> {
    let collisions = collisions
        .into()
        .into_lazy("collisions", CsvSchema::Infer, None)?;
    let holidays = holidays.into().into_lazy("holidays", CsvSchema::Infer, None)?;
    let weather = weather.into().into_lazy("weather", CsvSchema::Infer, None)?;

    timed("enrich_collisions", || {
        info!("Joining collisions with holidays and weather...");

        // Partition keys would collide with the collisions' own year/month
        let holidays = holidays.select([col("date"), col("holiday_name"), col("types")]);
        let weather = weather.select([
            col("date"),
            col("temp_max_c"),
            col("temp_min_c"),
            col("has_rain"),
            col("has_snow"),
            col("is_foggy"),
        ]);

        collisions
            .filter(col("date").gt_eq(lit(weather_cutoff())))
            .join(
                holidays,
                [col("date")],
                [col("date")],
                JoinArgs::new(JoinType::Left),
            )
            .join(
                weather,
                [col("date")],
                [col("date")],
                JoinArgs::new(JoinType::Left),
            )
            .with_columns([
                col("holiday_name").fill_null(lit(NON_HOLIDAY)),
                types_contain_any(&HIGH_IMPACT_TYPES).alias("high_impact_holiday"),
                types_contain_any(&PARTIAL_IMPACT_TYPES).alias("partial_impact_holiday"),
                types_contain_any(&LOW_IMPACT_TYPES).alias("low_impact_holiday"),
                col("has_rain").fill_null(lit(false)),
                col("has_snow").fill_null(lit(false)),
                col("is_foggy").fill_null(lit(false)),
            ])
            .rename(["temp_max_c", "temp_min_c"], ["max_temp", "min_temp"], true)
            .collect()
            .map_err(TransformError::polars("enriched collisions"))
    })
}

fn types_contain_any(types: &[&str]) -> Expr {
    types
        .iter()
        .map(|t| col("types").list().contains(lit(*t)))
        .reduce(|a, b| a.or(b))
        .unwrap_or_else(|| lit(false))
        .fill_null(lit(false))
}
