mod aggregate;
mod config;
mod enrich;
mod error;
mod extraction;
mod pipeline;
mod quality;
mod standardize;
mod storage;
mod types;
mod utils;

pub use error::PipelineError;
pub use error::TransformError;
pub use pipeline::*;

pub use config::*;

pub use extraction::error::ExtractionError;
pub use extraction::extractor::Extractor;
pub use extraction::holiday::HolidayRecord;
pub use extraction::retry::RetryPolicy;

pub use types::data_source::{CsvSchema, DataSource, Domain};

pub use standardize::{StandardizedTable, Standardizer};

pub use aggregate::*;
pub use enrich::enrich_collisions;

pub use quality::validate_frame;
pub use storage::{replace_directory, scan_partitioned, write_partitioned};
