//! Conversion eligibility and path-safety checks
//!
//! Decides whether an attachment may be converted and computes the URL, file
//! path and MIME type it must receive afterwards. Every function is pure apart
//! from the read-only existence check in [`validate_new_save_path`], and all
//! host state (the upload root) is passed in explicitly.
//!
//! Checks never error. A failed check is a [`ConversionRejection`] or `false`;
//! the batch runner decides whether to skip or abort.

use regex::Regex;
use serde_json::Value as JsonValue;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, LogLevel};
use crate::models::{
    mime_for_extension, ConversionDecision, ConversionPlan, ConversionRequest, SupportedFormat,
    UploadRoot,
};

/// Why an attachment (or the whole run) was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionRejection {
    #[error("target format should be one of: {}", SupportedFormat::extension_list())]
    InvalidTargetFormat { requested: Option<String> },

    #[error("not allowed file, mime type: {mime_type}, extension: {extension}")]
    DisallowedSource { mime_type: String, extension: String },

    #[error("computed url is invalid: {url}")]
    InvalidComputedUrl { url: String },

    #[error("invalid save path detected: {path}")]
    UnsafeSavePath { path: String },
}

impl ConversionRejection {
    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ConversionRejection::InvalidTargetFormat { .. } => "INVALID_TARGET_FORMAT",
            ConversionRejection::DisallowedSource { .. } => "DISALLOWED_SOURCE",
            ConversionRejection::InvalidComputedUrl { .. } => "INVALID_COMPUTED_URL",
            ConversionRejection::UnsafeSavePath { .. } => "UNSAFE_SAVE_PATH",
        }
    }

    /// Only an unusable target format stops the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConversionRejection::InvalidTargetFormat { .. })
    }

    pub fn log_level(&self) -> LogLevel {
        if self.is_fatal() {
            LogLevel::Error
        } else {
            LogLevel::Warn
        }
    }
}

/// Resolve the operator's requested output format.
///
/// Only a non-empty string exactly equal to a supported extension is accepted.
pub fn resolve_target_format(requested: Option<&str>) -> Result<SupportedFormat, ConversionRejection> {
    requested
        .filter(|s| !s.is_empty())
        .and_then(SupportedFormat::from_extension)
        .ok_or_else(|| ConversionRejection::InvalidTargetFormat {
            requested: requested.map(str::to_string),
        })
}

/// Same as [`resolve_target_format`] for loosely typed input. Anything other
/// than a JSON string (null, bool, number, ...) is rejected.
pub fn resolve_target_format_value(
    requested: Option<&JsonValue>,
) -> Result<SupportedFormat, ConversionRejection> {
    match requested {
        Some(JsonValue::String(s)) => resolve_target_format(Some(s)),
        Some(other) => Err(ConversionRejection::InvalidTargetFormat {
            requested: Some(other.to_string()),
        }),
        None => Err(ConversionRejection::InvalidTargetFormat { requested: None }),
    }
}

/// True iff `extension` is supported and its mapped MIME equals `mime_type`
/// exactly.
pub fn is_allowed_source(mime_type: &str, extension: &str) -> bool {
    mime_for_extension(extension) == Some(mime_type)
}

/// Strip a trailing `.extension` from a file name. A name that is nothing but
/// the suffix is left alone.
fn strip_extension<'a>(file_name: &'a str, extension: &str) -> &'a str {
    let Some(without_ext) = file_name.strip_suffix(extension) else {
        return file_name;
    };
    match without_ext.strip_suffix('.') {
        Some(stem) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Split at the last `/` into (directory, last segment).
fn split_last_segment(value: &str) -> (&str, &str) {
    match value.rfind('/') {
        Some(idx) => (&value[..idx], &value[idx + 1..]),
        None => ("", value),
    }
}

/// Rewrite the extension of the last URL segment.
pub fn compute_new_url(current_url: &str, current_extension: &str, new_extension: &str) -> String {
    let (prefix, file_name) = split_last_segment(current_url);
    format!(
        "{}/{}.{}",
        prefix,
        strip_extension(file_name, current_extension),
        new_extension
    )
}

/// `path` without its `.extension`, as a string (directory + '/' + stem).
/// `None` for paths that are not valid UTF-8.
fn path_without_extension(path: &Path, extension: &str) -> Option<String> {
    let raw = path.to_str()?;
    let (dir, file_name) = match raw.rfind('/') {
        Some(idx) => (&raw[..idx], &raw[idx + 1..]),
        None => (".", raw),
    };
    Some(format!("{}/{}", dir, strip_extension(file_name, extension)))
}

/// Destination path for a conversion: same directory and stem, new extension.
/// `None` for paths that are not valid UTF-8.
pub fn compute_new_save_path(
    original_path: &Path,
    original_extension: &str,
    new_extension: &str,
) -> Option<PathBuf> {
    path_without_extension(original_path, original_extension)
        .map(|stem| PathBuf::from(format!("{}.{}", stem, new_extension)))
}

fn url_pattern(base_url: &str) -> Result<Regex, regex::Error> {
    let extensions = SupportedFormat::ALL
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"\A{}/.*\.(?:{})\z",
        regex::escape(base_url),
        extensions
    ))
}

/// True iff `candidate_url` is `<base_url>/<anything>.<supported extension>`.
pub fn validate_new_url(upload_root: &UploadRoot, candidate_url: &str) -> bool {
    match url_pattern(upload_root.base_url()) {
        Ok(pattern) => pattern.is_match(candidate_url),
        Err(_) => false,
    }
}

/// Resolve `.` and `..` without touching the filesystem. `..` never climbs
/// above the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_within(base_dir: &Path, candidate: &Path) -> bool {
    if base_dir.as_os_str().is_empty() {
        return false;
    }
    normalize_lexically(candidate).starts_with(normalize_lexically(base_dir))
}

/// True iff all of:
/// 1. `candidate_path` resolves under the upload root's base directory;
/// 2. `original_path` exists;
/// 3. both paths are byte-identical once their extensions are removed.
pub fn validate_new_save_path(
    upload_root: &UploadRoot,
    candidate_path: &Path,
    original_path: &Path,
    new_extension: &str,
    original_extension: &str,
) -> bool {
    if !is_within(upload_root.base_dir(), candidate_path) {
        return false;
    }

    if std::fs::canonicalize(original_path).is_err() {
        return false;
    }

    match (
        path_without_extension(candidate_path, new_extension),
        path_without_extension(original_path, original_extension),
    ) {
        (Some(new_stem), Some(old_stem)) => new_stem == old_stem,
        _ => false,
    }
}

/// MIME type to record after converting to `new_extension`.
pub fn compute_new_mime_type(new_extension: SupportedFormat) -> &'static str {
    new_extension.mime_type()
}

/// Runs every per-attachment check against one upload root.
#[derive(Debug, Clone)]
pub struct ConversionValidator {
    upload_root: UploadRoot,
    url_pattern: Regex,
}

impl ConversionValidator {
    pub fn new(upload_root: UploadRoot) -> Result<Self, AppError> {
        let url_pattern = url_pattern(upload_root.base_url())
            .map_err(|e| AppError::Config(format!("Invalid upload base URL pattern: {}", e)))?;
        Ok(Self {
            upload_root,
            url_pattern,
        })
    }

    /// Validate a request and, when eligible, compute its conversion plan.
    ///
    /// Checks run in order: source type, new URL, new save path. The first
    /// failure is returned.
    pub fn evaluate(&self, request: &ConversionRequest) -> ConversionDecision {
        let attachment = &request.attachment;
        let target = request.target;
        let extension = attachment.extension();

        let source_format = match SupportedFormat::from_extension(extension) {
            Some(format) if is_allowed_source(&attachment.mime_type, extension) => format,
            _ => {
                return ConversionDecision::Rejected(ConversionRejection::DisallowedSource {
                    mime_type: attachment.mime_type.clone(),
                    extension: extension.to_string(),
                })
            }
        };

        let new_url = compute_new_url(&attachment.url, extension, target.as_str());
        if !self.url_pattern.is_match(&new_url) {
            return ConversionDecision::Rejected(ConversionRejection::InvalidComputedUrl {
                url: new_url,
            });
        }

        let unsafe_path = || ConversionRejection::UnsafeSavePath {
            path: attachment.file_path.display().to_string(),
        };

        let Some(new_path) =
            compute_new_save_path(&attachment.file_path, extension, target.as_str())
        else {
            return ConversionDecision::Rejected(unsafe_path());
        };

        if !validate_new_save_path(
            &self.upload_root,
            &new_path,
            &attachment.file_path,
            target.as_str(),
            extension,
        ) {
            return ConversionDecision::Rejected(ConversionRejection::UnsafeSavePath {
                path: new_path.display().to_string(),
            });
        }

        ConversionDecision::Accepted(ConversionPlan {
            source_format,
            target_format: target,
            new_url,
            new_path,
            new_mime_type: compute_new_mime_type(target),
        })
    }
}
