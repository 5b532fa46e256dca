use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    CacheWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache file '{0}'")]
    CacheRead(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    // Errors while streaming a response body into the cache file
    #[error("Download of {url} into '{path}' failed")]
    DownloadIo {
        url: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing error processing CSV cache file '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to parse JSON from '{0}'")]
    JsonParse(String, #[source] serde_json::Error),

    #[error("Failed to encode JSON for cache file '{0}'")]
    JsonEncode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to build table from fetched {source_name} records")]
    FrameBuild {
        source_name: String,
        #[source]
        source: PolarsError,
    },

    #[error("No {0} data fetched")]
    NoDataFetched(String),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
