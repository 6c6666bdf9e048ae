//! # Logging Utilities
//!
//! Logging infrastructure for kvmstat using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Pretty (development) and JSON (production) output
//! - `RUST_LOG` filtering
//! - Optional daily-rolling log files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kvmstat_utils::init_logging;
//!
//! // Initialize with default settings (reads from RUST_LOG env var)
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("collector started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=kvmstat_core=trace`)
//! - `KVMSTAT_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `KVMSTAT_LOG_FILE`: Optional path to log file (if not set, logs only to stderr)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "KVMSTAT_LOG_FORMAT";

/// Environment variable naming an optional log file
pub const LOG_FILE_ENV: &str = "KVMSTAT_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default for development)
    Pretty,
    /// JSON format (default for production)
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `kvmstat_core=debug`)
/// - `KVMSTAT_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `KVMSTAT_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `KVMSTAT_LOG_FORMAT` holds an unknown format
pub fn init_logging() -> Result<(), LoggingError>
{
    init_logging_internal(env_log_format()?, env_filter())
}

/// Format named by `KVMSTAT_LOG_FORMAT`, or `Pretty` when unset
///
/// ## Errors
///
/// Returns `InvalidFormat` if the variable holds an unknown format.
pub fn env_log_format() -> Result<LogFormat, LoggingError>
{
    match env::var(LOG_FORMAT_ENV) {
        Ok(s) => s.parse(),
        Err(_) => Ok(LogFormat::Pretty),
    }
}

/// Initialize logging with an explicit format
///
/// The filter still comes from `RUST_LOG`; only `KVMSTAT_LOG_FORMAT` is
/// overridden.
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_format(format: LogFormat) -> Result<(), LoggingError>
{
    init_logging_internal(format, env_filter())
}

/// Filter built from `RUST_LOG`, defaulting to `info`
fn env_filter() -> EnvFilter
{
    filter_from(env::var("RUST_LOG").ok().as_deref())
}

fn filter_from(directives: Option<&str>) -> EnvFilter
{
    // Plain levels (including aliases like `dbg`) become the default; directive lists go to EnvFilter
    if let Some(level) = directives.and_then(|s| s.parse::<LogLevel>().ok()) {
        return EnvFilter::new(Level::from(level).to_string());
    }
    directives
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(Level::INFO.to_string()))
}

/// Initialize logging with explicit level and format
///
/// The level overrides `RUST_LOG`. `KVMSTAT_LOG_FILE` is still honored.
///
/// ## Example
///
/// ```rust,no_run
/// use kvmstat_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_logging_internal(format, EnvFilter::new(Level::from(level).to_string()))
}

fn init_logging_internal(format: LogFormat, env_filter: EnvFilter) -> Result<(), LoggingError>
{
    let log_file = env::var(LOG_FILE_ENV).ok().map(PathBuf::from);

    // stderr keeps stdout free for the report itself
    let console_layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(env_filter.clone())
            .boxed(),
    };

    let file_layer = log_file.map(|file_path| {
        let file_appender = tracing_appender::rolling::daily(
            file_path.parent().unwrap_or(Path::new(".")),
            file_path.file_name().unwrap_or_default(),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // The writer must outlive every log call; keep it for the life of the process
        std::mem::forget(guard);

        match format {
            LogFormat::Pretty => fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false) // No ANSI in files
                .with_filter(env_filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_filter(env_filter)
                .boxed(),
        }
    });

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Unknown log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Unknown log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),
}
