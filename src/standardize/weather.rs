use crate::error::TransformError;
use crate::standardize::{
    date_partition_keys, lenient_f64, parse_date, StandardizedTable, Standardizer,
};
use crate::types::data_source::{CsvSchema, DataSource, Domain};
use crate::utils::timed;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::path::Path;

/// First day of weather history that is kept.
pub(crate) fn weather_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

const FOG_FLAGS: [&str; 2] = ["WT01", "WT02"];

impl Standardizer {
    /// Standardizes raw NOAA GHCN-Daily records and writes them to silver, partitioned by
    /// year and month.
    ///
    /// Temperatures and precipitation arrive in tenths of their unit and are converted.
    /// `is_foggy` is set when either `WT01` or `WT02` equals 1.
    pub fn process_weather(
        &self,
        input: impl Into<DataSource>,
        output_path: &Path,
    ) -> Result<StandardizedTable, TransformError> {
        timed("process_weather", || {
            info!("Processing weather (bronze -> silver)...");
            let lf = input
                .into()
                .into_lazy(Domain::Weather.name(), CsvSchema::AllText, None)?;
            let query = weather_query(lf)?;
            Self::materialize(Domain::Weather, query, output_path)
        })
    }
}

fn weather_query(mut lf: LazyFrame) -> Result<LazyFrame, TransformError> {
    let schema = lf
        .collect_schema()
        .map_err(TransformError::polars(Domain::Weather.name()))?;

    let fog_flags: Vec<Expr> = FOG_FLAGS
        .iter()
        .map(|name| {
            if schema.contains(name) {
                lenient_f64(name).eq(lit(1.0)).fill_null(lit(false))
            } else {
                warn!("Weather input has no '{}' column, treating it as not foggy", name);
                lit(false)
            }
        })
        .collect();
    let is_foggy = fog_flags
        .into_iter()
        .reduce(|a, b| a.or(b))
        .unwrap_or_else(|| lit(false));

    Ok(lf
        .with_columns([parse_date("DATE", "%Y-%m-%d").alias("date")])
        .filter(
            col("date")
                .is_not_null()
                .and(col("date").gt_eq(lit(weather_cutoff()))),
        )
        .with_columns([
            (lenient_f64("TMAX") / lit(10.0)).round(1).alias("temp_max_c"),
            (lenient_f64("TMIN") / lit(10.0)).round(1).alias("temp_min_c"),
            (lenient_f64("PRCP") / lit(10.0)).alias("precipitation_mm"),
            lenient_f64("SNOW").alias("snow_mm"),
            is_foggy.alias("is_foggy"),
            lenient_f64("PRCP").gt(lit(0.0)).fill_null(lit(false)).alias("has_rain"),
            lenient_f64("SNOW").gt(lit(0.0)).fill_null(lit(false)).alias("has_snow"),
        ])
        .select([
            col("date"),
            col("temp_max_c"),
            col("temp_min_c"),
            col("precipitation_mm"),
            col("snow_mm"),
            col("is_foggy"),
            col("has_rain"),
            col("has_snow"),
        ])
        .with_columns(date_partition_keys()))
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

    fn raw_weather() -> PolarsResult<DataFrame> {
        df!(
            "STATION" => ["USW00094728"; 5],
            "DATE" => [Some("2019-12-31"), Some("2024-01-01"), Some("2024-01-02"), None, Some("2024-01-03")],
            "TMAX" => ["100", " 250", "-50 ", "10", "30"],
            "TMIN" => ["0", "150", "-100", "0", "10"],
            "PRCP" => ["0", "50", "0", "5", "0"],
            "SNOW" => ["0", "0", "10", "0", "0"],
            "WT01" => [Some("0"), Some("1"), None, Some("1"), Some("0")],
            "WT02" => [Some("0"), Some(""), Some("1"), None, Some(" 0")]
        )
    }

    fn f64_at(df: &DataFrame, name: &str, idx: usize) -> PolarsResult<Option<f64>> {
        Ok(df.column(name)?.f64()?.get(idx))
    }

    #[test]
    fn test_cutoff_and_null_dates() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let df = standardizer()
            .process_weather(raw_weather()?, &dir.path().join("weather"))?
            .frame;

        assert_eq!(df.height(), 3);
        assert_eq!(
            df.get_column_names_str(),
            vec![
                "date",
                "temp_max_c",
                "temp_min_c",
                "precipitation_mm",
                "snow_mm",
                "is_foggy",
                "has_rain",
                "has_snow",
                "year",
                "month"
            ]
        );
        Ok(())
    }

    #[test]
    fn test_unit_conversion() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let df = standardizer()
            .process_weather(raw_weather()?, &dir.path().join("weather"))?
            .frame;

        assert_eq!(f64_at(&df, "temp_max_c", 0)?, Some(25.0));
        assert_eq!(f64_at(&df, "temp_min_c", 0)?, Some(15.0));
        assert_eq!(f64_at(&df, "precipitation_mm", 0)?, Some(5.0));
        assert_eq!(f64_at(&df, "temp_max_c", 1)?, Some(-5.0));
        assert_eq!(f64_at(&df, "snow_mm", 1)?, Some(10.0));
        Ok(())
    }

    #[test]
    fn test_fog_rain_and_snow_flags() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let df = standardizer()
            .process_weather(raw_weather()?, &dir.path().join("weather"))?
            .frame;

        let foggy = df.column("is_foggy")?.bool()?;
        let rain = df.column("has_rain")?.bool()?;
        let snow = df.column("has_snow")?.bool()?;

        // WT01 alone and WT02 alone are both fog; blanks and nulls are ignored
        assert_eq!(foggy.get(0), Some(true));
        assert_eq!(foggy.get(1), Some(true));
        // Both flags explicitly "0" is a clear day
        assert_eq!(foggy.get(2), Some(false));
        assert_eq!(rain.get(0), Some(true));
        assert_eq!(rain.get(1), Some(false));
        assert_eq!(snow.get(0), Some(false));
        assert_eq!(snow.get(1), Some(true));
        Ok(())
    }

    #[test]
    fn test_missing_fog_columns_mean_no_fog() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let raw = df!(
            "DATE" => ["2024-03-01"],
            "TMAX" => ["abc"],
            "TMIN" => ["12"],
            "PRCP" => [""],
            "SNOW" => ["0"]
        )?;

        let df = standardizer()
            .process_weather(raw, &dir.path().join("weather"))?
            .frame;

        assert_eq!(df.column("is_foggy")?.bool()?.get(0), Some(false));
        assert_eq!(df.column("has_rain")?.bool()?.get(0), Some(false));
        assert_eq!(f64_at(&df, "temp_max_c", 0)?, None);
        assert_eq!(f64_at(&df, "temp_min_c", 0)?, Some(1.2));
        Ok(())
    }

    #[test]
    fn test_reads_all_text_csv() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let raw = dir.path().join("weather_raw.csv");
        std::fs::write(
            &raw,
            "STATION,DATE,PRCP,SNOW,TMAX,TMIN,WT01,WT02\n\
             USW00094728,2024-01-01, 50,0, 100,50,,\n\
             USW00094728,2024-02-01,0,0,-20,-60,1,\n",
        )?;

        let table = standardizer().process_weather(raw.as_path(), &dir.path().join("silver"))?;
        let df = &table.frame;

        assert_eq!(df.height(), 2);
        assert_eq!(f64_at(df, "temp_max_c", 0)?, Some(10.0));
        assert_eq!(f64_at(df, "precipitation_mm", 0)?, Some(5.0));
        assert_eq!(df.column("is_foggy")?.bool()?.get(1), Some(true));
        assert!(table.path.join("year=2024/month=1/part-0.parquet").exists());
        assert!(table.path.join("year=2024/month=2/part-0.parquet").exists());
        Ok(())
    }
}
