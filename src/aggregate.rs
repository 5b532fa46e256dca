//! The gold layer: one daily fact table built from enriched collisions.

use crate::enrich::enrich_collisions;
use crate::error::TransformError;
use crate::storage::{replace_directory, write_csv, write_parquet};
use crate::types::data_source::DataSource;
use crate::utils::timed;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Injury and fatality counters summed per group.
pub const GOLD_METRIC_COLS: [&str; 8] = [
    "number_of_persons_injured",
    "number_of_persons_killed",
    "number_of_pedestrians_injured",
    "number_of_pedestrians_killed",
    "number_of_cyclist_injured",
    "number_of_cyclist_killed",
    "number_of_motorist_injured",
    "number_of_motorist_killed",
];

const GROUP_COLS: [&str; 13] = [
    "date",
    "borough",
    "zip_code",
    "is_weekend",
    "holiday_name",
    "high_impact_holiday",
    "partial_impact_holiday",
    "low_impact_holiday",
    "has_rain",
    "has_snow",
    "is_foggy",
    "max_temp",
    "min_temp",
];

pub const GOLD_PARQUET_FILE: &str = "daily_stats.parquet";
pub const GOLD_CSV_FILE: &str = "daily_stats.csv";

/// Where the gold outputs were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldOutput {
    pub parquet_path: PathBuf,
    pub csv_path: PathBuf,
    pub rows: usize,
}

/// Collapses enriched collisions into one row per distinct daily context.
///
/// Each group carries `total_accidents` (its row count) and the sum of every metric in
/// [`GOLD_METRIC_COLS`]. Rows are ordered by date, then borough and zip code.
pub fn aggregate_daily_stats(enriched: &DataFrame) -> Result<DataFrame, TransformError> {
    timed("aggregate_daily_stats", || {
        info!("Creating gold aggregations...");

        let mut aggs = vec![len().alias("total_accidents")];
        aggs.extend(GOLD_METRIC_COLS.iter().map(|name| col(*name).sum()));

        enriched
            .clone()
            .lazy()
            .group_by_stable(GROUP_COLS.iter().map(|name| col(*name)).collect::<Vec<_>>())
            .agg(aggs)
            .sort(["date", "borough", "zip_code"], SortMultipleOptions::default())
            .collect()
            .map_err(TransformError::polars("daily stats"))
    })
}

/// Enriches, aggregates and persists the daily fact table.
///
/// `gold_dir` is replaced with exactly two files, `daily_stats.parquet` and
/// `daily_stats.csv`.
pub fn process_gold(
    collisions: impl Into<DataSource>,
    holidays: impl Into<DataSource>,
    weather: impl Into<DataSource>,
    gold_dir: &Path,
) -> Result<GoldOutput, TransformError> {
    timed("process_gold", || {
        let enriched = enrich_collisions(collisions, holidays, weather)?;
        let mut daily = aggregate_daily_stats(&enriched)?;

        info!("Persisting gold data to {:?}...", gold_dir);
        replace_directory(gold_dir, |staging| {
            write_parquet(&mut daily, &staging.join(GOLD_PARQUET_FILE))?;
            write_csv(&mut daily, &staging.join(GOLD_CSV_FILE))
        })?;
        info!("Gold layer complete: {} rows", daily.height());

        Ok(GoldOutput {
            parquet_path: gold_dir.join(GOLD_PARQUET_FILE),
            csv_path: gold_dir.join(GOLD_CSV_FILE),
            rows: daily.height(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn enriched(days: &[NaiveDate], boroughs: &[&str], injured: &[i32]) -> PolarsResult<DataFrame> {
        let n = days.len();
        let mut columns = vec![
            Column::new("date".into(), days).cast(&DataType::Date)?,
            Column::new("borough".into(), boroughs),
            Column::new("zip_code".into(), vec!["10001"; n]),
            Column::new("is_weekend".into(), vec![false; n]),
            Column::new("holiday_name".into(), vec![crate::enrich::NON_HOLIDAY; n]),
            Column::new("high_impact_holiday".into(), vec![false; n]),
            Column::new("partial_impact_holiday".into(), vec![false; n]),
            Column::new("low_impact_holiday".into(), vec![false; n]),
            Column::new("has_rain".into(), vec![true; n]),
            Column::new("has_snow".into(), vec![false; n]),
            Column::new("is_foggy".into(), vec![false; n]),
            Column::new("max_temp".into(), vec![Some(5.0f64); n]),
            Column::new("min_temp".into(), vec![None::<f64>; n]),
        ];
        for name in GOLD_METRIC_COLS {
            let values = if name == "number_of_persons_injured" {
                injured.to_vec()
            } else {
                vec![0i32; n]
            };
            columns.push(Column::new(name.into(), values));
        }
        DataFrame::new(columns)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn i64_at(df: &DataFrame, name: &str, idx: usize) -> PolarsResult<Option<i64>> {
        Ok(df.column(name)?.cast(&DataType::Int64)?.i64()?.get(idx))
    }

    #[test]
    fn test_sums_per_group() -> Result<(), Box<dyn std::error::Error>> {
        let df = enriched(&[day(1), day(1)], &["BROOKLYN", "BROOKLYN"], &[1, 2])?;

        let daily = aggregate_daily_stats(&df)?;

        assert_eq!(daily.height(), 1);
        assert_eq!(i64_at(&daily, "total_accidents", 0)?, Some(2));
        assert_eq!(i64_at(&daily, "number_of_persons_injured", 0)?, Some(3));
        assert_eq!(i64_at(&daily, "number_of_motorist_killed", 0)?, Some(0));
        // A null temperature is a valid group key
        assert_eq!(daily.column("min_temp")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_no_row_is_lost() -> Result<(), Box<dyn std::error::Error>> {
        let df = enriched(
            &[day(3), day(1), day(2), day(1), day(3)],
            &["QUEENS", "BRONX", "BRONX", "BRONX", "BROOKLYN"],
            &[0, 1, 0, 4, 2],
        )?;

        let daily = aggregate_daily_stats(&df)?;

        let total = daily
            .column("total_accidents")?
            .cast(&DataType::Int64)?
            .i64()?
            .sum();
        assert_eq!(total, Some(df.height() as i64));
        assert_eq!(daily.height(), 4);

        let dates = daily.column("date")?.cast(&DataType::String)?;
        let dates: Vec<Option<&str>> = dates.str()?.into_iter().collect();
        assert_eq!(
            dates,
            vec![
                Some("2024-01-01"),
                Some("2024-01-02"),
                Some("2024-01-03"),
                Some("2024-01-03")
            ]
        );
        assert_eq!(daily.column("borough")?.str()?.get(2), Some("BROOKLYN"));
        Ok(())
    }

    #[test]
    fn test_process_gold_writes_both_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let gold = dir.path().join("gold");
        std::fs::create_dir_all(&gold)?;
        std::fs::write(gold.join("stale.csv"), "old")?;

        let mut collisions = enriched(&[day(5)], &["MANHATTAN"], &[1])?;
        collisions = collisions.drop_many([
            "holiday_name",
            "high_impact_holiday",
            "partial_impact_holiday",
            "low_impact_holiday",
            "has_rain",
            "has_snow",
            "is_foggy",
            "max_temp",
            "min_temp",
        ]);
        let holidays = df!(
            "date" => Vec::<NaiveDate>::new(),
            "holiday_name" => Vec::<&str>::new()
        )?
        .lazy()
        .with_columns([
            col("date").cast(DataType::Date),
            lit(Null {})
                .cast(DataType::List(Box::new(DataType::String)))
                .alias("types"),
        ])
        .collect()?;
        let weather = df!(
            "date" => Vec::<NaiveDate>::new(),
            "temp_max_c" => Vec::<f64>::new(),
            "temp_min_c" => Vec::<f64>::new(),
            "has_rain" => Vec::<bool>::new(),
            "has_snow" => Vec::<bool>::new(),
            "is_foggy" => Vec::<bool>::new()
        )?
        .lazy()
        .with_columns([col("date").cast(DataType::Date)])
        .collect()?;

        let output = process_gold(collisions, holidays, weather, &gold)?;

        assert_eq!(output.rows, 1);
        assert!(output.parquet_path.exists());
        assert!(output.csv_path.exists());
        assert!(!gold.join("stale.csv").exists());

        let csv = std::fs::read_to_string(&output.csv_path)?;
        assert!(csv.starts_with("date,borough,zip_code"));
        assert!(csv.contains("Non-Holiday"));
        Ok(())
    }
}
