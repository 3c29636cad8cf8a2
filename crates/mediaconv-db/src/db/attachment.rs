use async_trait::async_trait;
use mediaconv_core::{AppError, AttachmentRecord, SupportedFormat, UploadRoot};
use sqlx::{FromRow, MySql, MySqlPool};

use crate::db::transaction::TransactionGuard;
use crate::store::AttachmentStore;

/// Meta key holding an attachment's path relative to the upload root
pub const ATTACHED_FILE_META_KEY: &str = "_wp_attached_file";

#[derive(Debug, FromRow)]
struct AttachmentRow {
    #[sqlx(rename = "ID")]
    id: u64,
    guid: String,
    post_mime_type: String,
    attached_file: Option<String>,
}

impl AttachmentRow {
    fn into_record(self, upload_root: &UploadRoot) -> AttachmentRecord {
        let file_path = upload_root.resolve_file_path(self.attached_file.as_deref().unwrap_or(""));
        let url = upload_root.resolve_url(self.attached_file.as_deref(), &self.guid);
        AttachmentRecord {
            id: self.id,
            file_path,
            url,
            mime_type: self.post_mime_type,
        }
    }
}

fn list_attachments_sql(table_prefix: &str, mime_count: usize) -> String {
    let placeholders = vec!["?"; mime_count].join(", ");
    format!(
        r#"
        SELECT p.ID, p.guid, p.post_mime_type,
            (SELECT m.meta_value FROM {prefix}postmeta m
             WHERE m.post_id = p.ID AND m.meta_key = ?
             ORDER BY m.meta_id ASC LIMIT 1) AS attached_file
        FROM {prefix}posts p
        WHERE p.post_type = 'attachment'
          AND p.post_status = 'inherit'
          AND p.post_mime_type IN ({placeholders})
        ORDER BY p.ID ASC
        LIMIT ? OFFSET ?
        "#,
        prefix = table_prefix,
        placeholders = placeholders,
    )
}

fn update_post_sql(table_prefix: &str) -> String {
    format!(
        "UPDATE {}posts SET guid = ?, post_mime_type = ? WHERE ID = ?",
        table_prefix
    )
}

fn count_meta_sql(table_prefix: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {}postmeta WHERE post_id = ? AND meta_key = ?",
        table_prefix
    )
}

fn update_meta_sql(table_prefix: &str) -> String {
    format!(
        "UPDATE {}postmeta SET meta_value = ? WHERE post_id = ? AND meta_key = ?",
        table_prefix
    )
}

fn insert_meta_sql(table_prefix: &str) -> String {
    format!(
        "INSERT INTO {}postmeta (post_id, meta_key, meta_value) VALUES (?, ?, ?)",
        table_prefix
    )
}

/// Zero-based row offset of a 1-based page
fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

/// Repository for attachment posts and their attached-file metadata
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: MySqlPool,
    table_prefix: String,
    upload_root: UploadRoot,
}

impl AttachmentRepository {
    /// `table_prefix` is interpolated into SQL and must already be validated
    /// (see `ConverterConfig::validate`).
    pub fn new(pool: MySqlPool, table_prefix: impl Into<String>, upload_root: UploadRoot) -> Self {
        Self {
            pool,
            table_prefix: table_prefix.into(),
            upload_root,
        }
    }

    /// Fetch one page of convertible attachments
    #[tracing::instrument(skip(self), fields(db.table = "posts", db.operation = "select"))]
    pub async fn list_attachments(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<AttachmentRecord>, AppError> {
        let mime_types = SupportedFormat::all_mime_types();
        let sql = list_attachments_sql(&self.table_prefix, mime_types.len());

        let mut query = sqlx::query_as::<MySql, AttachmentRow>(&sql).bind(ATTACHED_FILE_META_KEY);
        for mime in mime_types {
            query = query.bind(mime);
        }
        let rows = query
            .bind(page_size)
            .bind(page_offset(page, page_size))
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(page, rows = rows.len(), "Fetched attachment page");

        Ok(rows
            .into_iter()
            .map(|row| row.into_record(&self.upload_root))
            .collect())
    }

    /// Rewrite GUID, MIME type and attached-file path in one transaction
    #[tracing::instrument(skip(self), fields(db.table = "posts", db.operation = "update", db.record_id = id))]
    pub async fn update_converted(
        &self,
        id: u64,
        new_url: &str,
        new_mime_type: &str,
    ) -> Result<(), AppError> {
        let attached_file = self.upload_root.relative_path_for_url(new_url);

        let mut tx = TransactionGuard::begin(&self.pool).await?;

        sqlx::query(&update_post_sql(&self.table_prefix))
            .bind(new_url)
            .bind(new_mime_type)
            .bind(id)
            .execute(&mut **tx)
            .await?;

        let existing = sqlx::query_scalar::<MySql, i64>(&count_meta_sql(&self.table_prefix))
            .bind(id)
            .bind(ATTACHED_FILE_META_KEY)
            .fetch_one(&mut **tx)
            .await?;

        if existing > 0 {
            sqlx::query(&update_meta_sql(&self.table_prefix))
                .bind(attached_file)
                .bind(id)
                .bind(ATTACHED_FILE_META_KEY)
                .execute(&mut **tx)
                .await?;
        } else {
            sqlx::query(&insert_meta_sql(&self.table_prefix))
                .bind(id)
                .bind(ATTACHED_FILE_META_KEY)
                .bind(attached_file)
                .execute(&mut **tx)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            attachment_id = id,
            guid = %new_url,
            mime_type = %new_mime_type,
            attached_file = %attached_file,
            "Attachment record updated"
        );

        Ok(())
    }
}

#[async_trait]
impl AttachmentStore for AttachmentRepository {
    async fn list_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<AttachmentRecord>, AppError> {
        self.list_attachments(page, page_size).await
    }

    async fn update_attachment(
        &self,
        id: u64,
        new_url: &str,
        new_mime_type: &str,
    ) -> Result<(), AppError> {
        self.update_converted(id, new_url, new_mime_type).await
    }
}
