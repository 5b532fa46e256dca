use crate::config::ExtractionConfig;
use crate::extraction::error::ExtractionError;
use crate::extraction::holiday::{holidays_to_frame, HolidayRecord};
use crate::extraction::retry::RetryPolicy;
use crate::types::data_source::{read_raw_csv, CsvSchema};
use futures_util::TryStreamExt;
use log::{info, warn};
use polars::frame::DataFrame;
use reqwest::{Client, Method};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Fetches raw source payloads into the bronze cache.
///
/// A destination that already exists on disk is never fetched again, so a re-run only
/// pays for the sources that are missing. Every request goes through the same
/// [`RetryPolicy`] and carries the configured `User-Agent`, which some public APIs
/// require (anonymous clients get a 403).
pub struct Extractor {
    client: Client,
    retry: RetryPolicy,
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Result<Extractor, ExtractionError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ExtractionError::ClientBuild)?;
        let retry = RetryPolicy::builder()
            .max_attempts(config.max_attempts)
            .base_delay(Duration::from_millis(config.backoff_base_ms))
            .build();
        Ok(Extractor { client, retry })
    }

    /// Downloads `url` into `destination` unless it is already cached, then parses it as CSV.
    ///
    /// The response body is streamed chunk by chunk into a hidden temporary file next to
    /// `destination`, which is only renamed into place once the body is complete. A failed
    /// or cancelled download removes the temporary file, so the cache never holds a
    /// truncated payload.
    pub async fn fetch_file(
        &self,
        url: &str,
        destination: &Path,
        csv_schema: CsvSchema,
    ) -> Result<(DataFrame, PathBuf), ExtractionError> {
        if fs::metadata(destination).await.is_ok() {
            info!("Cache hit for {:?}, skipping download", destination);
        } else {
            warn!("Cache miss for {:?}. Downloading from {}", destination, url);
            ensure_parent_dir(destination).await?;

            self.download(url, destination).await?;
            info!("Downloaded {} to {:?}", url, destination);
        }

        let df = Self::csv_to_dataframe(destination, csv_schema).await?;
        Ok((df, destination.to_path_buf()))
    }

    /// Fetches one page per period from `{base_url}/{period}/{entity_id}` and caches the
    /// combined records as a JSON array at `destination`.
    ///
    /// A failing period is logged and skipped. Ending up with no records at all is fatal
    /// ([`ExtractionError::NoDataFetched`]), since nothing downstream can be built from it.
    pub async fn fetch_paginated(
        &self,
        base_url: &str,
        entity_id: &str,
        periods: &[i32],
        destination: &Path,
    ) -> Result<(DataFrame, PathBuf), ExtractionError> {
        let records = if fs::metadata(destination).await.is_ok() {
            info!("Cache hit for {:?}, skipping API calls", destination);
            let bytes = fs::read(destination)
                .await
                .map_err(|e| ExtractionError::CacheRead(destination.to_path_buf(), e))?;
            serde_json::from_slice::<Vec<HolidayRecord>>(&bytes)
                .map_err(|e| ExtractionError::JsonParse(destination.display().to_string(), e))?
        } else {
            let mut records: Vec<HolidayRecord> = Vec::new();
            for period in periods {
                let url = format!("{}/{}/{}", base_url.trim_end_matches('/'), period, entity_id);
                match self.fetch_page(&url).await {
                    Ok(page) => {
                        info!("Fetched {} records for {} from {}", page.len(), period, url);
                        records.extend(page);
                    }
                    Err(e) => warn!("Skipping period {}: {}", period, e),
                }
            }

            if records.is_empty() {
                return Err(ExtractionError::NoDataFetched("holidays".to_string()));
            }

            ensure_parent_dir(destination).await?;
            let json = serde_json::to_vec_pretty(&records)
                .map_err(|e| ExtractionError::JsonEncode(destination.to_path_buf(), e))?;
            fs::write(destination, json)
                .await
                .map_err(|e| ExtractionError::CacheWrite(destination.to_path_buf(), e))?;
            info!("Cached {} holiday records to {:?}", records.len(), destination);
            records
        };

        let df = holidays_to_frame(&records).map_err(|e| ExtractionError::FrameBuild {
            source_name: "holidays".to_string(),
            source: e,
        })?;
        Ok((df, destination.to_path_buf()))
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<HolidayRecord>, ExtractionError> {
        let response = self
            .retry
            .send(&Method::GET, url, || self.client.get(url).send())
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractionError::NetworkRequest(url.to_string(), e))?;
        serde_json::from_slice(&bytes).map_err(|e| ExtractionError::JsonParse(url.to_string(), e))
    }

    /// Streams the body of `url` into `destination`.
    ///
    /// `destination` only appears once the whole body is on disk. Until then the bytes
    /// live in a temporary file that is deleted when this future errors or is dropped.
    async fn download(&self, url: &str, destination: &Path) -> Result<(), ExtractionError> {
        let response = self
            .retry
            .send(&Method::GET, url, || self.client.get(url).send())
            .await?;

        let download_io = |source: std::io::Error| ExtractionError::DownloadIo {
            url: url.to_string(),
            path: destination.to_path_buf(),
            source,
        };

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let (std_file, partial_path) = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(&parent)
            .map_err(|e| ExtractionError::CacheWrite(parent.clone(), e))?
            .into_parts();

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let mut file = fs::File::from_std(std_file);
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(download_io)?;
        file.flush().await.map_err(download_io)?;
        drop(file);

        partial_path
            .persist(destination)
            .map_err(|e| ExtractionError::CacheWrite(destination.to_path_buf(), e.error))?;
        info!("Wrote {} bytes to {:?}", written, destination);
        Ok(())
    }

    /// Parses a cached CSV file on a blocking task.
    async fn csv_to_dataframe(
        path: &Path,
        csv_schema: CsvSchema,
    ) -> Result<DataFrame, ExtractionError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            read_raw_csv(&path_buf, csv_schema).map_err(|e| ExtractionError::CsvRead {
                path: path_buf.clone(),
                source: e,
            })
        })
        .await?
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<(), ExtractionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtractionError::CacheDirCreation(parent.to_path_buf(), e))?;
    }
    Ok(())
}
