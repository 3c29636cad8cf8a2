//! Store trait abstraction for the conversion pipeline
//!
//! Keeps the pipeline independent of the database so it can be exercised
//! against an in-memory store.

use async_trait::async_trait;
use mediaconv_core::{AppError, AttachmentRecord};

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Convertible attachments ordered by ID. `page` starts at 1; an empty
    /// result means there are no more pages.
    async fn list_page(&self, page: u32, page_size: u32)
        -> Result<Vec<AttachmentRecord>, AppError>;

    /// Point an attachment at its converted file: new GUID, new MIME type and
    /// the matching attached-file path.
    async fn update_attachment(
        &self,
        id: u64,
        new_url: &str,
        new_mime_type: &str,
    ) -> Result<(), AppError>;
}
