use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where and how much to log. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `seathru=debug,warn`.
    pub level: String,
    /// Directory of the daily-rolling log files; `None` logs to the console only.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    /// Rotated files kept on disk.
    pub max_files: usize,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: Some(PathBuf::from("logs")),
            file_prefix: "seathru".to_string(),
            max_files: 5,
            ansi: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum LogSetupError {
    #[error("Invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create log file appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Filter from `RUST_LOG`, falling back to `directive`.
pub fn env_filter(directive: &str) -> Result<EnvFilter, LogSetupError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(directive).map_err(|source| LogSetupError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the global subscriber: console output (warnings and errors on
/// stderr, the rest on stdout) plus an optional daily-rolling file.
///
/// Succeeds at most once per process.
pub fn setup_logging(config: &LogConfig) -> Result<(), LogSetupError> {
    let filter = env_filter(&config.level)?;

    let file_layer = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LogSetupError::Directory {
                path: dir.clone(),
                source,
            })?;

            let appender = tracing_appender::rolling::Builder::new()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .max_log_files(config.max_files.max(1))
                .build(dir)?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            if LOG_GUARD.set(guard).is_err() {
                return Err(LogSetupError::AlreadyInitialized);
            }

            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(config.ansi)
        .with_writer(console_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LogSetupError::AlreadyInitialized)
}
