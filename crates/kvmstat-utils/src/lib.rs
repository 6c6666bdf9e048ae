//! # kvmstat Utilities
//!
//! Shared utilities, logging, config, and helpers for kvmstat.
//!
//! This crate provides common functionality used across the kvmstat workspace,
//! including logging infrastructure built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    env_log_format, init_logging, init_logging_with_format, init_logging_with_level, LogFormat, LogLevel, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
