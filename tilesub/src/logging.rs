//! Logging infrastructure.
//!
//! Structured `tracing` output to a log file and, optionally, the console:
//! - Writes to `<log_dir>/tilesub.log` (cleared on session start)
//! - Non-blocking file writer
//! - Configurable via RUST_LOG environment variable (default `info`)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilesub.log";

/// Errors from logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Log directory or file could not be prepared
    #[error("Failed to prepare log file: {0}")]
    Io(#[from] io::Error),

    /// A global subscriber is already installed
    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Initialize the global subscriber.
///
/// Creates `log_dir` if needed, truncates `log_file` and installs a file
/// layer plus, when `console` is set, a stderr layer.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    console: bool,
) -> Result<LoggingGuard, LoggingError> {
    let path = prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .with_timer(LocalTime::new(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        )));

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(true)
            .compact()
            .boxed()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        path,
    })
}

/// Create the log directory and clear any previous log file.
pub fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file);
    fs::write(&path, "")?;
    Ok(path)
}

/// Default log directory (~/.tilesub/logs).
pub fn default_log_dir() -> PathBuf {
    crate::config::config_directory().join("logs")
}
