//! Typed view of the pipeline's YAML configuration.

use crate::error::PipelineError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub sources: SourcesConfig,
    pub silver: SilverConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub handoff: Handoff,
}

/// Root directories of each layer.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    pub bronze: PathBuf,
    pub silver: PathBuf,
    pub gold: PathBuf,
    pub logs: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub collisions: FileSourceConfig,
    pub weather: FileSourceConfig,
    pub holidays: HolidaySourceConfig,
}

/// A source downloaded as a single file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileSourceConfig {
    pub url: String,
    pub filename: String,
}

/// The paginated holiday API, fetched once per year.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidaySourceConfig {
    pub url_base: String,
    pub country_code: String,
    pub years: Vec<i32>,
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SilverConfig {
    pub collisions: CollisionsSilverConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollisionsSilverConfig {
    /// Raw column name → canonical column name. Only mapped columns survive.
    pub rename_map: BTreeMap<String, String>,
    /// Canonical names of the numeric injury/fatality columns.
    pub metric_cols: Vec<String>,
}

/// HTTP behaviour of the extractor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            user_agent: "NYCCollisionETL/1.0".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            backoff_base_ms: 1000,
        }
    }
}

/// Which output of a stage feeds the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handoff {
    /// Pass the materialized tables along in memory.
    #[default]
    InMemory,
    /// Re-read every stage's input from what the previous stage wrote to disk.
    OnDisk,
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str, origin: &Path) -> Result<Self, PipelineError> {
        serde_yaml::from_str(yaml).map_err(|e| PipelineError::ConfigParse(origin.to_path_buf(), e))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, PipelineError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ConfigRead(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml, path)
    }
}

/// Creates every layer root that does not exist yet.
pub fn ensure_directories(paths: &PathsConfig) -> Result<(), PipelineError> {
    for dir in [&paths.bronze, &paths.silver, &paths.gold, &paths.logs] {
        std::fs::create_dir_all(dir)
            .map_err(|e| PipelineError::DirectoryCreation(dir.clone(), e))?;
    }
    Ok(())
}
