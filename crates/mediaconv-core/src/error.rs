//! Error types module
//!
//! All fallible operations outside the validator report an `AppError`. The
//! validator itself never errors; it returns a
//! [`ConversionRejection`](crate::validation::ConversionRejection) instead.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Warning level - for per-item problems the batch can skip
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Describes how an error should be reported by the batch runner
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, LogLevel) {
    match err {
        AppError::Database(_) => ("DATABASE_ERROR", LogLevel::Error),
        AppError::ImageProcessing(_) => ("IMAGE_PROCESSING_ERROR", LogLevel::Warn),
        AppError::Config(_) => ("CONFIG_ERROR", LogLevel::Error),
        AppError::Internal(_) => ("INTERNAL_ERROR", LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).1
    }
}
