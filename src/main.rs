//! CLI entry point for the collisions ETL pipeline.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use collision_etl::{ensure_directories, run_pipeline, PipelineConfig};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Environment {
    Dev,
    Prod,
}

#[derive(Parser)]
#[command(name = "collision-etl")]
#[command(about = "NYC collisions ETL pipeline", long_about = None)]
struct Cli {
    /// Pipeline configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Execution environment
    #[arg(long, value_enum, default_value_t = Environment::Dev)]
    env: Environment,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match block_on_detached(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Drives `future` on a fresh runtime and returns without waiting for blocking tasks.
///
/// An interrupted run leaves the silver/gold transform running on a blocking thread;
/// it must not keep the process alive.
fn block_on_detached<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

async fn run(cli: Cli) -> ExitCode {
    // Logging needs the configured log directory, so config errors go to stderr as-is
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Pipeline failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_logging(&config.paths.logs, cli.verbose);

    let start = Instant::now();
    info!("Starting ETL pipeline [env: {:?}]", cli.env);
    if cli.verbose {
        info!("Debug logging enabled");
    }

    tokio::select! {
        result = run_pipeline(&config) => match result {
            Ok(summary) => {
                info!(
                    "Pipeline finished successfully in {:.2?}: {} gold rows at {:?}",
                    start.elapsed(),
                    summary.gold.rows,
                    summary.gold.parquet_path
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Pipeline failed: {:#}", anyhow::Error::from(e));
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Pipeline interrupted by user");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let config = PipelineConfig::from_yaml_file(path)?;
    ensure_directories(&config.paths).context("Failed to prepare data directories")?;
    Ok(config)
}

/// Colored stderr output plus a daily rolling file in `log_dir`.
fn init_logging(log_dir: &Path, verbose: bool) -> WorkerGuard {
    let level = if verbose { "debug" } else { "info" };

    let file_appender = tracing_appender::rolling::daily(log_dir, "collision_etl.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_returns_without_waiting_for_blocking_work() -> std::io::Result<()> {
        let start = Instant::now();

        let code = block_on_detached(async {
            let _transform =
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(5)));
            tokio::time::sleep(Duration::from_millis(10)).await;
            EXIT_INTERRUPTED
        })?;

        assert_eq!(code, EXIT_INTERRUPTED);
        assert!(start.elapsed() < Duration::from_secs(2));
        Ok(())
    }
}
