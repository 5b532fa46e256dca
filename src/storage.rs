//! Persistence primitives shared by the silver and gold layers.

use crate::error::TransformError;
use log::{debug, info};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const PART_FILE_NAME: &str = "part-0.parquet";

/// Replaces `target` with a directory populated by `write`.
///
/// `write` fills a staging directory next to `target`. Only after it succeeds is the old
/// `target` removed and the staging directory renamed into place, so no file from a
/// previous run survives and a failed write leaves the previous output untouched.
pub fn replace_directory<F>(target: &Path, write: F) -> Result<(), TransformError>
where
    F: FnOnce(&Path) -> Result<(), TransformError>,
{
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| TransformError::OutputDirectory(parent.clone(), e))?;

    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(&parent)
        .map_err(|e| TransformError::OutputDirectory(parent.clone(), e))?;

    // Dropping `staging` on error removes the half-written directory
    write(staging.path())?;

    if target.exists() {
        debug!("Removing previous output at {:?}", target);
        fs::remove_dir_all(target)
            .map_err(|e| TransformError::OutputDirectory(target.to_path_buf(), e))?;
    }
    let staging_path = staging.keep();
    fs::rename(&staging_path, target)
        .map_err(|e| TransformError::OutputDirectory(target.to_path_buf(), e))?;
    Ok(())
}

/// Writes `df` under `dir` split by `keys`, one `key=value` directory level per key.
///
/// `dir` is fully replaced. An empty table still produces a single schema-only file so
/// the dataset can be scanned back.
pub fn write_partitioned(df: &DataFrame, keys: &[&str], dir: &Path) -> Result<(), TransformError> {
    replace_directory(dir, |staging| {
        if df.height() == 0 {
            return write_parquet(&mut df.clone(), &staging.join(PART_FILE_NAME));
        }

        let parts = df
            .partition_by_stable(keys.to_vec(), true)
            .map_err(TransformError::polars(dir.display().to_string()))?;
        let partition_count = parts.len();

        for mut part in parts {
            let mut partition_dir = staging.to_path_buf();
            for key in keys {
                let value = part
                    .column(key)
                    .and_then(|c| c.get(0))
                    .map_err(TransformError::polars(dir.display().to_string()))?;
                partition_dir.push(format!("{}={}", key, value));
            }
            fs::create_dir_all(&partition_dir)
                .map_err(|e| TransformError::OutputDirectory(partition_dir.clone(), e))?;
            write_parquet(&mut part, &partition_dir.join(PART_FILE_NAME))?;
        }

        info!(
            "Wrote {} rows in {} partitions to {:?}",
            df.height(),
            partition_count,
            dir
        );
        Ok(())
    })
}

/// Lazily reads every parquet file below `dir` as one table.
///
/// Files are read in path order so repeated scans return rows in the same order.
/// Hidden entries (staging directories) are skipped.
pub fn scan_partitioned(dir: &Path) -> Result<LazyFrame, TransformError> {
    let mut files = Vec::new();
    collect_parquet_files(dir, &mut files)?;
    files.sort();

    if files.is_empty() {
        return Err(TransformError::NoParquetFiles(dir.to_path_buf()));
    }

    let frames = files
        .iter()
        .map(|path| {
            LazyFrame::scan_parquet(path, Default::default())
                .map_err(|e| TransformError::ParquetScan(path.clone(), e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    concat(frames, UnionArgs::default()).map_err(TransformError::polars(dir.display().to_string()))
}

fn collect_parquet_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), TransformError> {
    let entries =
        fs::read_dir(dir).map_err(|e| TransformError::DatasetListing(dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TransformError::DatasetListing(dir.to_path_buf(), e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_parquet_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    Ok(())
}

pub(crate) fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), TransformError> {
    let file =
        fs::File::create(path).map_err(|e| TransformError::ParquetWriteIo(path.to_path_buf(), e))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(df)
        .map_err(|e| TransformError::ParquetWritePolars(path.to_path_buf(), e))?;
    Ok(())
}

pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), TransformError> {
    let file =
        fs::File::create(path).map_err(|e| TransformError::CsvWriteIo(path.to_path_buf(), e))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| TransformError::CsvWritePolars(path.to_path_buf(), e))?;
    Ok(())
}
