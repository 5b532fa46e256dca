//! Runs extraction, standardization and aggregation end to end.

use crate::aggregate::{process_gold, GoldOutput};
use crate::config::{Handoff, PipelineConfig};
use crate::error::PipelineError;
use crate::extraction::extractor::Extractor;
use crate::quality::validate_frame;
use crate::standardize::{StandardizedTable, Standardizer};
use crate::types::data_source::{CsvSchema, DataSource};
use log::info;
use polars::frame::DataFrame;
use std::path::PathBuf;
use tokio::task;

/// Row counts for the three sources at one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRows {
    pub collisions: usize,
    pub holidays: usize,
    pub weather: usize,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub bronze_rows: LayerRows,
    pub silver_rows: LayerRows,
    pub gold: GoldOutput,
}

struct BronzeCapture {
    frame: DataFrame,
    path: PathBuf,
}

impl BronzeCapture {
    fn handoff(self, mode: Handoff) -> DataSource {
        match mode {
            Handoff::InMemory => DataSource::Table(self.frame),
            Handoff::OnDisk => DataSource::Path(self.path),
        }
    }
}

fn silver_handoff(table: StandardizedTable, mode: Handoff) -> DataSource {
    match mode {
        Handoff::InMemory => DataSource::Table(table.frame),
        Handoff::OnDisk => DataSource::Path(table.path),
    }
}

/// Runs the full bronze → silver → gold pipeline.
///
/// Either every output is written or the first fatal error is returned. Raw captures
/// already in the bronze cache are reused.
pub async fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary, PipelineError> {
    info!("Starting pipeline (handoff: {:?})", config.handoff);

    info!("--- PHASE 1: EXTRACTION (BRONZE) ---");
    let extractor = Extractor::new(&config.extraction)?;
    let bronze = &config.paths.bronze;
    let sources = &config.sources;

    let (frame, path) = extractor
        .fetch_file(
            &sources.collisions.url,
            &bronze.join(&sources.collisions.filename),
            CsvSchema::Infer,
        )
        .await?;
    validate_frame(&frame, "Collisions Bronze", &["CRASH DATE"])?;
    let collisions = BronzeCapture { frame, path };

    let (frame, path) = extractor
        .fetch_paginated(
            &sources.holidays.url_base,
            &sources.holidays.country_code,
            &sources.holidays.years,
            &bronze.join(&sources.holidays.filename),
        )
        .await?;
    validate_frame(&frame, "Holidays Bronze", &["date"])?;
    let holidays = BronzeCapture { frame, path };

    let (frame, path) = extractor
        .fetch_file(
            &sources.weather.url,
            &bronze.join(&sources.weather.filename),
            CsvSchema::AllText,
        )
        .await?;
    validate_frame(&frame, "Weather Bronze", &["DATE"])?;
    let weather = BronzeCapture { frame, path };

    let bronze_rows = LayerRows {
        collisions: collisions.frame.height(),
        holidays: holidays.frame.height(),
        weather: weather.frame.height(),
    };

    let config = config.clone();
    let (silver_rows, gold) =
        task::spawn_blocking(move || transform(&config, collisions, holidays, weather)).await??;

    info!("Pipeline finished: {} gold rows", gold.rows);
    Ok(PipelineSummary {
        bronze_rows,
        silver_rows,
        gold,
    })
}

fn transform(
    config: &PipelineConfig,
    collisions: BronzeCapture,
    holidays: BronzeCapture,
    weather: BronzeCapture,
) -> Result<(LayerRows, GoldOutput), PipelineError> {
    let mode = config.handoff;
    let silver = &config.paths.silver;

    info!("--- PHASE 2: STANDARDIZATION (SILVER) ---");
    let standardizer = Standardizer::new(&config.silver);
    let collisions =
        standardizer.process_collisions(collisions.handoff(mode), &silver.join("collisions"))?;
    let holidays =
        standardizer.process_holidays(holidays.handoff(mode), &silver.join("holidays"))?;
    let weather = standardizer.process_weather(weather.handoff(mode), &silver.join("weather"))?;

    let silver_rows = LayerRows {
        collisions: collisions.frame.height(),
        holidays: holidays.frame.height(),
        weather: weather.frame.height(),
    };

    info!("--- PHASE 3: AGGREGATION (GOLD) ---");
    let gold = process_gold(
        silver_handoff(collisions, mode),
        silver_handoff(holidays, mode),
        silver_handoff(weather, mode),
        &config.paths.gold,
    )?;

    Ok((silver_rows, gold))
}
