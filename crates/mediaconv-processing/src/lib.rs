//! Mediaconv Processing Library
//!
//! This crate provides the image codecs and the batch pipeline that converts
//! media library attachments between jpg, jpeg, gif and png.

pub mod codec;
pub mod compression;
pub mod pipeline;
pub mod summary;

#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used types
pub use codec::{CodecError, CodecRegistry, ImageCodec, RasterCodec};
pub use compression::{ImageCompressor, QualityPreset};
pub use pipeline::{ConversionPipeline, PipelineOptions};
pub use summary::{AttachmentIssue, ConversionSummary};
