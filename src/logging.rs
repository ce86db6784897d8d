//! Tracing subscriber setup

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log file path {0:?}")]
    InvalidPath(PathBuf),

    #[error("Failed to create log directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Filter built from `RUST_LOG` if set, otherwise from the configured level
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a global subscriber writing to `log_file`.
///
/// The returned guard flushes buffered lines when dropped and must be kept
/// alive for as long as the process logs.
pub fn init(config: &LogConfig, log_file: &Path) -> Result<WorkerGuard, LoggingError> {
    let (dir, file_name) = match (log_file.parent(), log_file.file_name()) {
        (Some(dir), Some(file_name)) => (dir, file_name),
        _ => return Err(LoggingError::InvalidPath(log_file.to_path_buf())),
    };
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_writer(writer)
        .with_ansi(false);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}
