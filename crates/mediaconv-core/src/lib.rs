//! Mediaconv Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! conversion validator shared by every mediaconv component.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::ConverterConfig;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AttachmentRecord, ConversionDecision, ConversionPlan, ConversionRequest, SupportedFormat,
    UploadRoot,
};
pub use validation::{ConversionRejection, ConversionValidator};
