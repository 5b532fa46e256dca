use crate::error::TransformError;
use crate::extraction::holiday::{holidays_to_frame, HolidayRecord};
use crate::standardize::{parse_date, StandardizedTable, Standardizer};
use crate::types::data_source::{CsvSchema, DataSource, Domain};
use crate::utils::timed;
use log::info;
use polars::prelude::*;
use std::fs;
use std::path::Path;

impl Standardizer {
    /// Standardizes raw holidays and writes them to silver, partitioned by year.
    ///
    /// Accepts the table returned by the extractor, the bronze JSON capture, or a silver
    /// parquet directory.
    pub fn process_holidays(
        &self,
        input: impl Into<DataSource>,
        output_path: &Path,
    ) -> Result<StandardizedTable, TransformError> {
        timed("process_holidays", || {
            info!("Processing holidays (bronze -> silver)...");
            let lf = input.into().into_lazy(
                Domain::Holidays.name(),
                CsvSchema::Infer,
                Some(read_holiday_json),
            )?;
            Self::materialize(Domain::Holidays, holidays_query(lf), output_path)
        })
    }
}

fn holidays_query(lf: LazyFrame) -> LazyFrame {
    lf.with_columns([
        parse_date("date", "%Y-%m-%d"),
        col("types").cast(DataType::List(Box::new(DataType::String))),
    ])
    .rename(["name"], ["holiday_name"], true)
    // The API has been seen returning the same holiday twice
    .unique_stable(None, UniqueKeepStrategy::First)
    .with_columns([col("date").dt().year().cast(DataType::Int32).alias("year")])
}

fn read_holiday_json(path: &Path) -> Result<DataFrame, TransformError> {
    let text = fs::read_to_string(path).map_err(|e| TransformError::JsonRead(path.to_path_buf(), e))?;
    let records: Vec<HolidayRecord> =
        serde_json::from_str(&text).map_err(|e| TransformError::JsonParse(path.to_path_buf(), e))?;
    holidays_to_frame(&records).map_err(TransformError::polars(Domain::Holidays.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollisionsSilverConfig, SilverConfig};
    use tempfile::tempdir;

    fn standardizer() -> Standardizer {
        Standardizer::new(&SilverConfig {
            collisions: CollisionsSilverConfig {
                rename_map: Default::default(),
                metric_cols: vec![],
            },
        })
    }

    fn record(date: &str, name: &str, types: &[&str]) -> HolidayRecord {
        HolidayRecord {
            date: date.to_string(),
            local_name: Some(name.to_string()),
            name: name.to_string(),
            country_code: Some("US".to_string()),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_exact_duplicates_are_removed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let raw = holidays_to_frame(&[
            record("2024-12-25", "Christmas", &["Public"]),
            record("2024-12-25", "Christmas", &["Public"]),
            record("2024-07-04", "Independence Day", &["Public", "Bank"]),
        ])?;

        let df = standardizer()
            .process_holidays(raw, &dir.path().join("holidays"))?
            .frame;

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("holiday_name")?.str()?.get(0), Some("Christmas"));
        assert_eq!(df.column("holiday_name")?.str()?.get(1), Some("Independence Day"));
        assert!(df.column("name").is_err());
        Ok(())
    }

    #[test]
    fn test_types_and_year() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let raw = holidays_to_frame(&[record("2023-01-16", "Martin Luther King, Jr. Day", &["Public"])])?;

        let table = standardizer().process_holidays(raw, &dir.path().join("holidays"))?;
        let df = &table.frame;

        assert_eq!(df.column("date")?.dtype(), &DataType::Date);
        assert_eq!(
            df.column("types")?.dtype(),
            &DataType::List(Box::new(DataType::String))
        );
        assert_eq!(df.column("year")?.i32()?.get(0), Some(2023));
        assert!(table.path.join("year=2023/part-0.parquet").exists());
        Ok(())
    }

    #[test]
    fn test_reads_bronze_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let raw = dir.path().join("holidays_raw.json");
        let records = vec![
            record("2024-01-01", "New Year's Day", &["Public"]),
            record("2025-01-01", "New Year's Day", &["Public"]),
        ];
        fs::write(&raw, serde_json::to_string(&records)?)?;

        let table = standardizer().process_holidays(raw.as_path(), &dir.path().join("silver"))?;

        assert_eq!(table.frame.height(), 2);
        assert!(table.path.join("year=2024/part-0.parquet").exists());
        assert!(table.path.join("year=2025/part-0.parquet").exists());
        Ok(())
    }

    #[test]
    fn test_malformed_json_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let raw = dir.path().join("holidays_raw.json");
        fs::write(&raw, "{not json")?;

        let result = standardizer().process_holidays(raw.as_path(), &dir.path().join("silver"));

        assert!(matches!(result, Err(TransformError::JsonParse(..))));
        Ok(())
    }
}
