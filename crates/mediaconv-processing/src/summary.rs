//! Types reported by the conversion pipeline.

use mediaconv_core::SupportedFormat;
use serde::Serialize;

/// An attachment that was skipped or failed, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttachmentIssue {
    pub attachment_id: u64,
    pub code: &'static str,
    pub message: String,
}

/// Result of a whole conversion run.
///
/// In a dry run `converted` counts the attachments that would have been
/// converted.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionSummary {
    pub target_format: SupportedFormat,
    pub dry_run: bool,
    pub pages: u32,
    pub examined: usize,
    pub converted: usize,
    /// Already stored in the target format
    pub unchanged: usize,
    pub skipped: Vec<AttachmentIssue>,
    pub failed: Vec<AttachmentIssue>,
}

impl ConversionSummary {
    pub fn new(target_format: SupportedFormat, dry_run: bool) -> Self {
        Self {
            target_format,
            dry_run,
            pages: 0,
            examined: 0,
            converted: 0,
            unchanged: 0,
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
