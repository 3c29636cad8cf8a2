//! Mock attachment store for testing

use async_trait::async_trait;
use mediaconv_core::{AppError, AttachmentRecord};
use mediaconv_db::AttachmentStore;
use std::sync::{Arc, Mutex};

/// An update the pipeline asked the store to apply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub id: u64,
    pub new_url: String,
    pub new_mime_type: String,
}

/// In-memory store paging over a fixed list of attachments
#[derive(Clone, Default)]
pub struct MockAttachmentStore {
    attachments: Arc<Mutex<Vec<AttachmentRecord>>>,
    updates: Arc<Mutex<Vec<RecordedUpdate>>>,
    fail_list: bool,
    fail_updates: bool,
}

impl MockAttachmentStore {
    pub fn new(mut attachments: Vec<AttachmentRecord>) -> Self {
        attachments.sort_by_key(|a| a.id);
        Self {
            attachments: Arc::new(Mutex::new(attachments)),
            ..Self::default()
        }
    }

    /// Every `list_page` call fails with an internal error
    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Every `update_attachment` call fails with an internal error
    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentStore for MockAttachmentStore {
    async fn list_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<AttachmentRecord>, AppError> {
        if self.fail_list {
            return Err(AppError::Internal("connection refused".to_string()));
        }

        let start = page.saturating_sub(1) as usize * page_size as usize;
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn update_attachment(
        &self,
        id: u64,
        new_url: &str,
        new_mime_type: &str,
    ) -> Result<(), AppError> {
        if self.fail_updates {
            return Err(AppError::Internal("deadlock detected".to_string()));
        }

        self.updates.lock().unwrap().push(RecordedUpdate {
            id,
            new_url: new_url.to_string(),
            new_mime_type: new_mime_type.to_string(),
        });

        Ok(())
    }
}
