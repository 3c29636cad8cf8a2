//! Image codec backends
//!
//! The pipeline only sees the [`ImageCodec`] capability; [`CodecRegistry`]
//! maps each supported format to a backend so backends can be swapped (or
//! mocked) without touching the pipeline.

use image::{DynamicImage, ImageFormat, ImageReader};
use mediaconv_core::{AppError, SupportedFormat};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::compression::{ImageCompressor, QualityPreset};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        AppError::ImageProcessing(err.to_string())
    }
}

/// Decode/encode capability for one image format
pub trait ImageCodec: Send + Sync {
    /// Read and decode the file at `path`
    fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError>;

    /// Encode `image` and write it to `path`, replacing any existing file
    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), CodecError>;
}

fn decode_as(path: &Path, format: ImageFormat) -> Result<DynamicImage, CodecError> {
    let mut reader = ImageReader::open(path).map_err(|e| CodecError::Open {
        path: path.display().to_string(),
        source: e,
    })?;
    reader.set_format(format);
    reader.decode().map_err(|e| CodecError::Decode {
        path: path.display().to_string(),
        source: e,
    })
}

/// Mode of every written image. The web server serving the upload
/// directory usually runs as a different user.
#[cfg(unix)]
const PUBLISHED_FILE_MODE: u32 = 0o644;

/// Write through a temp file in the destination directory so a failed
/// encode never leaves a truncated file behind.
fn write_atomically(path: &Path, data: &[u8]) -> Result<(), CodecError> {
    let write_err = |e: std::io::Error| CodecError::Write {
        path: path.display().to_string(),
        source: e,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    // Temp files are created 0600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(PUBLISHED_FILE_MODE))
            .map_err(write_err)?;
    }
    file.as_file().sync_all().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Backend built on the `image` crate, one instance per output format
pub struct RasterCodec {
    format: SupportedFormat,
    quality: QualityPreset,
}

impl RasterCodec {
    pub fn new(format: SupportedFormat, quality: QualityPreset) -> Self {
        Self { format, quality }
    }

    fn image_format(&self) -> ImageFormat {
        match self.format {
            format if format.is_jpeg_family() => ImageFormat::Jpeg,
            SupportedFormat::Png => ImageFormat::Png,
            _ => ImageFormat::Gif,
        }
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError> {
        decode_as(path, self.image_format())
    }

    fn encode(&self, image: &DynamicImage, path: &Path) -> Result<(), CodecError> {
        let data = ImageCompressor::compress(image, self.format, self.quality).map_err(|e| {
            CodecError::Encode {
                path: path.display().to_string(),
                source: e,
            }
        })?;

        write_atomically(path, &data)?;

        tracing::debug!(
            path = %path.display(),
            format = %self.format,
            size_bytes = data.len(),
            "Encoded image"
        );

        Ok(())
    }
}

/// Maps every supported format to the codec that handles it
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<SupportedFormat, Arc<dyn ImageCodec>>,
}

impl CodecRegistry {
    /// `image`-crate backends for every format. `jpg` and `jpeg` share the
    /// JPEG backend.
    pub fn new(quality: QualityPreset) -> Self {
        let jpeg: Arc<dyn ImageCodec> = Arc::new(RasterCodec::new(SupportedFormat::Jpeg, quality));
        let mut codecs: HashMap<SupportedFormat, Arc<dyn ImageCodec>> = HashMap::new();
        codecs.insert(SupportedFormat::Jpg, jpeg.clone());
        codecs.insert(SupportedFormat::Jpeg, jpeg);
        codecs.insert(
            SupportedFormat::Png,
            Arc::new(RasterCodec::new(SupportedFormat::Png, quality)),
        );
        codecs.insert(
            SupportedFormat::Gif,
            Arc::new(RasterCodec::new(SupportedFormat::Gif, quality)),
        );
        Self { codecs }
    }

    /// Replace the backend for one format
    pub fn with_codec(mut self, format: SupportedFormat, codec: Arc<dyn ImageCodec>) -> Self {
        self.codecs.insert(format, codec);
        self
    }

    pub fn codec_for(&self, format: SupportedFormat) -> Option<Arc<dyn ImageCodec>> {
        self.codecs.get(&format).cloned()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new(QualityPreset::default())
    }
}
