//! Domain models
//!
//! Every value here is request-scoped; nothing in this module owns state
//! between calls.

pub mod attachment;
pub mod conversion;
pub mod format;

pub use attachment::{AttachmentRecord, UploadRoot};
pub use conversion::{ConversionDecision, ConversionPlan, ConversionRequest};
pub use format::{mime_for_extension, SupportedFormat};
