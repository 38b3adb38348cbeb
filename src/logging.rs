//! Tracing setup: console output plus one log file per process start

use crate::error::{PipelineError, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "netsec_trainer=info";

/// Path of the log file for a run stamped `timestamp`
pub fn log_file_path(log_dir: &Path, timestamp: &str) -> PathBuf {
    log_dir.join(format!("{}.log", timestamp))
}

/// Install the global subscriber and return the log file path
pub fn init(log_dir: &Path, timestamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let path = log_file_path(log_dir, timestamp);
    let file = File::create(&path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .map_err(|e| PipelineError::Config(format!("logging already initialised: {}", e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        assert_eq!(
            log_file_path(Path::new("logs"), "01_02_2024_03_04_05"),
            Path::new("logs/01_02_2024_03_04_05.log")
        );
    }
}
