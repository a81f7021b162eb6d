//! Logging setup for a pipeline run.
//!
//! Every run logs to the console and to its own file,
//! `<log_dir>/etl_<run_id>.log`, so the log of a run can be found from the
//! run id printed in its summary.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let log_file = plata::logging::init(Path::new("logs"), "20240131_101500")
//!     .expect("Failed to initialize logging");
//! tracing::info!(file = %log_file.display(), "Logging initialized");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Path of the log file for `run_id`.
pub fn log_file_path(log_dir: &Path, run_id: &str) -> PathBuf {
    log_dir.join(format!("etl_{run_id}.log"))
}

fn run_appender(log_dir: &Path, run_id: &str) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(format!("etl_{run_id}"))
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to create run log file appender")
}

/// Initializes console and file logging for one run.
///
/// The level defaults to INFO and can be overridden with `RUST_LOG`.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the subscriber
/// was already set.
pub fn init(log_dir: &Path, run_id: &str) -> Result<PathBuf> {
    let appender = run_appender(log_dir, run_id)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_file_path(log_dir, run_id))
}

/// Console-only logging, for commands that must not write files.
///
/// # Errors
///
/// Returns error if the subscriber was already set.
pub fn init_console() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .context("Failed to install tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path(Path::new("logs"), "20240131_101500");
        assert_eq!(path, PathBuf::from("logs/etl_20240131_101500.log"));
    }

    #[test]
    fn test_appender_creates_run_file() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let _appender = run_appender(&log_dir, "20240131_101500").unwrap();

        assert!(log_file_path(&log_dir, "20240131_101500").exists());
    }
}
