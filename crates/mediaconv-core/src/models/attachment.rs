use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage root of the media library: where files live on disk and the URL
/// prefix they are served under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRoot {
    base_url: String,
    base_dir: PathBuf,
}

impl UploadRoot {
    /// Create an upload root. A trailing `/` on `base_url` is dropped.
    pub fn new(base_url: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            base_dir: base_dir.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve an `_wp_attached_file` value to an absolute path.
    ///
    /// Relative values live under `base_dir`; absolute ones are returned as-is.
    pub fn resolve_file_path(&self, attached_file: &str) -> PathBuf {
        let path = Path::new(attached_file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Public URL of an attachment.
    ///
    /// Falls back to the stored GUID when there is no attached file or the
    /// file lies outside `base_dir`.
    pub fn resolve_url(&self, attached_file: Option<&str>, guid: &str) -> String {
        let Some(file) = attached_file.filter(|f| !f.is_empty()) else {
            return guid.to_string();
        };

        let path = Path::new(file);
        if !path.is_absolute() {
            return format!("{}/{}", self.base_url, file);
        }

        match path.strip_prefix(&self.base_dir) {
            Ok(relative) => format!("{}/{}", self.base_url, relative.to_string_lossy()),
            Err(_) => guid.to_string(),
        }
    }

    /// The `_wp_attached_file` value for a URL under this root.
    ///
    /// URLs outside the root are returned unchanged.
    pub fn relative_path_for_url<'a>(&self, url: &'a str) -> &'a str {
        url.strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(url)
    }
}

/// A media library attachment as read from the host store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: u64,
    pub file_path: PathBuf,
    pub url: String,
    pub mime_type: String,
}

impl AttachmentRecord {
    /// Extension of the stored file, exactly as written (no case folding).
    /// Empty when the file has none.
    pub fn extension(&self) -> &str {
        self.file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }
}
