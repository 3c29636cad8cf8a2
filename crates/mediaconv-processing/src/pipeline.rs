//! Batch conversion pipeline: list → validate → decode → encode → update.
//!
//! Attachments are processed one at a time in ID order. A problem with one
//! attachment is logged and recorded in the summary, then the batch moves on;
//! only a failure to list a page aborts the run.

use mediaconv_core::{
    AppError, AttachmentRecord, ConversionDecision, ConversionRequest, ConversionValidator,
    ErrorMetadata, LogLevel, SupportedFormat,
};
use mediaconv_db::AttachmentStore;
use std::path::Path;
use std::sync::Arc;

use crate::codec::CodecRegistry;
use crate::summary::{AttachmentIssue, ConversionSummary};

const DEFAULT_PAGE_SIZE: u32 = 100;

/// Batch behaviour
#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions {
    pub page_size: u32,
    /// Validate and decode only; nothing is written to disk or the store
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            dry_run: false,
        }
    }
}

enum Outcome {
    Converted,
    Unchanged,
    Skipped(AttachmentIssue),
    Failed(AttachmentIssue),
}

pub struct ConversionPipeline {
    store: Arc<dyn AttachmentStore>,
    validator: Arc<ConversionValidator>,
    codecs: CodecRegistry,
    options: PipelineOptions,
}

impl ConversionPipeline {
    pub fn new(
        store: Arc<dyn AttachmentStore>,
        validator: Arc<ConversionValidator>,
        codecs: CodecRegistry,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            validator,
            codecs,
            options,
        }
    }

    /// Convert every eligible attachment to `target`
    #[tracing::instrument(skip(self), fields(dry_run = self.options.dry_run, page_size = self.options.page_size))]
    pub async fn run(&self, target: SupportedFormat) -> Result<ConversionSummary, AppError> {
        let mut summary = ConversionSummary::new(target, self.options.dry_run);
        let mut page = 1;

        loop {
            let attachments = self.store.list_page(page, self.options.page_size).await?;
            if attachments.is_empty() {
                break;
            }
            summary.pages = page;

            for attachment in attachments {
                summary.examined += 1;
                match self.convert_one(attachment, target).await {
                    Outcome::Converted => summary.converted += 1,
                    Outcome::Unchanged => summary.unchanged += 1,
                    Outcome::Skipped(issue) => summary.skipped.push(issue),
                    Outcome::Failed(issue) => summary.failed.push(issue),
                }
            }

            page += 1;
        }

        tracing::info!(
            target_format = %target,
            pages = summary.pages,
            examined = summary.examined,
            converted = summary.converted,
            unchanged = summary.unchanged,
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            "Conversion run finished"
        );

        Ok(summary)
    }

    async fn convert_one(&self, attachment: AttachmentRecord, target: SupportedFormat) -> Outcome {
        let attachment_id = attachment.id;
        let request = ConversionRequest::new(target, attachment);

        let plan = match self.validator.evaluate(&request) {
            ConversionDecision::Accepted(plan) => plan,
            ConversionDecision::Rejected(reason) => {
                tracing::warn!(
                    attachment_id,
                    code = reason.code(),
                    mime_type = %request.attachment.mime_type,
                    path = %request.attachment.file_path.display(),
                    url = %request.attachment.url,
                    "Skipping attachment: {}",
                    reason
                );
                return Outcome::Skipped(AttachmentIssue {
                    attachment_id,
                    code: reason.code(),
                    message: reason.to_string(),
                });
            }
        };

        if plan.source_format == target {
            tracing::debug!(attachment_id, "Attachment already stored in target format");
            return Outcome::Unchanged;
        }

        let exists = tokio::fs::try_exists(&plan.new_path).await;
        if let Some(issue) = destination_conflict(attachment_id, &plan.new_path, exists) {
            tracing::warn!(
                attachment_id,
                code = issue.code,
                path = %plan.new_path.display(),
                "Skipping attachment: {}",
                issue.message
            );
            return Outcome::Skipped(issue);
        }

        let (Some(decoder), Some(encoder)) = (
            self.codecs.codec_for(plan.source_format),
            self.codecs.codec_for(target),
        ) else {
            return Self::fail(
                attachment_id,
                AppError::ImageProcessing(format!(
                    "no codec registered for {} -> {}",
                    plan.source_format, target
                )),
                "Codec lookup failed",
            );
        };

        let source_path = request.attachment.file_path.clone();
        let image = match tokio::task::spawn_blocking(move || decoder.decode(&source_path)).await {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => return Self::fail(attachment_id, e.into(), "Image creation failed"),
            Err(e) => {
                return Self::fail(
                    attachment_id,
                    AppError::Internal(format!("decode task failed: {}", e)),
                    "Image creation failed",
                )
            }
        };

        if self.options.dry_run {
            tracing::info!(
                attachment_id,
                from = %plan.source_format,
                to = %target,
                new_url = %plan.new_url,
                "Dry run: attachment would be converted"
            );
            return Outcome::Converted;
        }

        let new_path = plan.new_path.clone();
        match tokio::task::spawn_blocking(move || encoder.encode(&image, &new_path)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Self::fail(attachment_id, e.into(), "Image conversion failed"),
            Err(e) => {
                return Self::fail(
                    attachment_id,
                    AppError::Internal(format!("encode task failed: {}", e)),
                    "Image conversion failed",
                )
            }
        }

        if let Err(e) = self
            .store
            .update_attachment(attachment_id, &plan.new_url, plan.new_mime_type)
            .await
        {
            // Leave no converted file behind that no record points at.
            if let Err(cleanup) = tokio::fs::remove_file(&plan.new_path).await {
                tracing::warn!(
                    attachment_id,
                    path = %plan.new_path.display(),
                    error = %cleanup,
                    "Failed to remove converted file after record update failure"
                );
            }
            return Self::fail(attachment_id, e, "Attachment update failed");
        }

        tracing::info!(
            attachment_id,
            from = %plan.source_format,
            to = %target,
            new_url = %plan.new_url,
            new_path = %plan.new_path.display(),
            "Attachment converted"
        );

        Outcome::Converted
    }

    fn fail(attachment_id: u64, err: AppError, context: &str) -> Outcome {
        match err.log_level() {
            LogLevel::Error => {
                tracing::error!(attachment_id, code = err.error_code(), error = %err, "{}", context)
            }
            LogLevel::Warn => {
                tracing::warn!(attachment_id, code = err.error_code(), error = %err, "{}", context)
            }
        }

        Outcome::Failed(AttachmentIssue {
            attachment_id,
            code: err.error_code(),
            message: format!("{}: {}", context, err),
        })
    }
}

/// Never write over an existing file, nor over one whose existence cannot be
/// checked.
fn destination_conflict(
    attachment_id: u64,
    path: &Path,
    exists: std::io::Result<bool>,
) -> Option<AttachmentIssue> {
    match exists {
        Ok(false) => None,
        Ok(true) => Some(AttachmentIssue {
            attachment_id,
            code: "DESTINATION_EXISTS",
            message: format!("destination already exists: {}", path.display()),
        }),
        Err(e) => Some(AttachmentIssue {
            attachment_id,
            code: "DESTINATION_UNCHECKED",
            message: format!("cannot check destination {}: {}", path.display(), e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, ImageCodec};
    use crate::test_helpers::{write_test_png, MockAttachmentStore};
    use image::DynamicImage;
    use mediaconv_core::UploadRoot;
    use tempfile::tempdir;

    const BASE_URL: &str = "https://example.com/wp-content/uploads";

    fn pipeline(
        store: Arc<MockAttachmentStore>,
        root: &Path,
        codecs: CodecRegistry,
        options: PipelineOptions,
    ) -> ConversionPipeline {
        let validator = ConversionValidator::new(UploadRoot::new(BASE_URL, root)).unwrap();
        ConversionPipeline::new(store, Arc::new(validator), codecs, options)
    }

    fn attachment(root: &Path, id: u64, relative: &str, mime: &str) -> AttachmentRecord {
        AttachmentRecord {
            id,
            file_path: root.join(relative),
            url: format!("{}/{}", BASE_URL, relative),
            mime_type: mime.to_string(),
        }
    }

    #[tokio::test]
    async fn test_converts_png_to_jpg_and_updates_record() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("2021/a.png"));
        let store = Arc::new(MockAttachmentStore::new(vec![attachment(
            dir.path(),
            1,
            "2021/a.png",
            "image/png",
        )]));

        let summary = pipeline(
            store.clone(),
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions::default(),
        )
        .run(SupportedFormat::Jpg)
        .await
        .unwrap();

        assert_eq!(summary.converted, 1);
        assert!(summary.skipped.is_empty());
        assert!(!summary.has_failures());
        assert!(dir.path().join("2021/a.jpg").exists());
        assert!(dir.path().join("2021/a.png").exists());

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, 1);
        assert_eq!(updates[0].new_url, format!("{}/2021/a.jpg", BASE_URL));
        assert_eq!(updates[0].new_mime_type, "image/jpg");
    }

    #[tokio::test]
    async fn test_skips_disallowed_and_unsafe_attachments() {
        let dir = tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        write_test_png(&uploads.join("ok.png"));
        write_test_png(&dir.path().join("outside.png"));
        std::fs::write(uploads.join("shell.php"), b"<?php").unwrap();

        let store = Arc::new(MockAttachmentStore::new(vec![
            attachment(&uploads, 1, "ok.png", "image/jpeg"),
            attachment(&uploads, 2, "shell.php", "image/png"),
            attachment(&uploads, 3, "../outside.png", "image/png"),
        ]));

        let summary = pipeline(
            store.clone(),
            &uploads,
            CodecRegistry::default(),
            PipelineOptions::default(),
        )
        .run(SupportedFormat::Gif)
        .await
        .unwrap();

        assert_eq!(summary.examined, 3);
        assert_eq!(summary.converted, 0);
        let codes: Vec<_> = summary.skipped.iter().map(|s| s.code).collect();
        assert_eq!(
            codes,
            vec!["DISALLOWED_SOURCE", "DISALLOWED_SOURCE", "UNSAFE_SAVE_PATH"]
        );
        assert!(store.updates().is_empty());
        assert!(!dir.path().join("outside.gif").exists());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"));
        let store = Arc::new(MockAttachmentStore::new(vec![attachment(
            dir.path(),
            5,
            "a.png",
            "image/png",
        )]));

        let summary = pipeline(
            store.clone(),
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions {
                dry_run: true,
                ..PipelineOptions::default()
            },
        )
        .run(SupportedFormat::Jpeg)
        .await
        .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.converted, 1);
        assert!(!dir.path().join("a.jpeg").exists());
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_pages_through_all_attachments() {
        let dir = tempdir().unwrap();
        let mut records = Vec::new();
        for id in 1..=5u64 {
            let name = format!("img{}.png", id);
            write_test_png(&dir.path().join(&name));
            records.push(attachment(dir.path(), id, &name, "image/png"));
        }
        let store = Arc::new(MockAttachmentStore::new(records));

        let summary = pipeline(
            store.clone(),
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions {
                page_size: 2,
                dry_run: false,
            },
        )
        .run(SupportedFormat::Gif)
        .await
        .unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.converted, 5);
        assert_eq!(store.updates().len(), 5);
    }

    #[tokio::test]
    async fn test_same_format_is_unchanged() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"));
        let store = Arc::new(MockAttachmentStore::new(vec![attachment(
            dir.path(),
            1,
            "a.png",
            "image/png",
        )]));

        let summary = pipeline(
            store.clone(),
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions::default(),
        )
        .run(SupportedFormat::Png)
        .await
        .unwrap();

        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.converted, 0);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_existing_destination_is_not_overwritten() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"));
        std::fs::write(dir.path().join("a.gif"), b"someone else's file").unwrap();
        let store = Arc::new(MockAttachmentStore::new(vec![attachment(
            dir.path(),
            1,
            "a.png",
            "image/png",
        )]));

        let summary = pipeline(
            store.clone(),
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions::default(),
        )
        .run(SupportedFormat::Gif)
        .await
        .unwrap();

        assert_eq!(summary.skipped[0].code, "DESTINATION_EXISTS");
        assert_eq!(
            std::fs::read(dir.path().join("a.gif")).unwrap(),
            b"someone else's file"
        );
    }

    #[test]
    fn test_destination_check_error_is_a_conflict() {
        let path = Path::new("/srv/uploads/a.jpg");
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");

        let issue = destination_conflict(4, path, Err(err)).unwrap();
        assert_eq!(issue.attachment_id, 4);
        assert_eq!(issue.code, "DESTINATION_UNCHECKED");
        assert!(issue.message.contains("denied"));

        assert_eq!(destination_conflict(4, path, Ok(true)).unwrap().code, "DESTINATION_EXISTS");
        assert!(destination_conflict(4, path, Ok(false)).is_none());
    }

    struct BrokenEncoder;

    impl ImageCodec for BrokenEncoder {
        fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError> {
            Err(CodecError::Open {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "unused"),
            })
        }

        fn encode(&self, _image: &DynamicImage, path: &Path) -> Result<(), CodecError> {
            Err(CodecError::Encode {
                path: path.display().to_string(),
                source: anyhow::anyhow!("encoder exploded"),
            })
        }
    }

    #[tokio::test]
    async fn test_encode_failure_is_recorded_and_batch_continues() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"));
        write_test_png(&dir.path().join("b.png"));
        let store = Arc::new(MockAttachmentStore::new(vec![
            attachment(dir.path(), 1, "a.png", "image/png"),
            attachment(dir.path(), 2, "b.png", "image/png"),
        ]));
        let codecs =
            CodecRegistry::default().with_codec(SupportedFormat::Gif, Arc::new(BrokenEncoder));

        let summary = pipeline(store.clone(), dir.path(), codecs, PipelineOptions::default())
            .run(SupportedFormat::Gif)
            .await
            .unwrap();

        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.failed[0].code, "IMAGE_PROCESSING_ERROR");
        assert!(summary.failed[0].message.contains("encoder exploded"));
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_removes_converted_file() {
        let dir = tempdir().unwrap();
        write_test_png(&dir.path().join("a.png"));
        let store = Arc::new(
            MockAttachmentStore::new(vec![attachment(dir.path(), 1, "a.png", "image/png")])
                .failing_updates(),
        );

        let summary = pipeline(
            store.clone(),
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions::default(),
        )
        .run(SupportedFormat::Jpg)
        .await
        .unwrap();

        assert_eq!(summary.failed.len(), 1);
        assert!(!dir.path().join("a.jpg").exists());
    }

    #[tokio::test]
    async fn test_list_failure_aborts_run() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MockAttachmentStore::new(vec![]).failing_list());

        let result = pipeline(
            store,
            dir.path(),
            CodecRegistry::default(),
            PipelineOptions::default(),
        )
        .run(SupportedFormat::Jpg)
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_summary_serializes() {
        let summary = ConversionSummary::new(SupportedFormat::Jpeg, true);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["target_format"], "jpeg");
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["converted"], 0);
    }
}
