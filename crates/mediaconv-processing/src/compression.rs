use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use mediaconv_core::SupportedFormat;
use std::io::Cursor;

/// Quality presets for image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    #[default]
    Normal, // Default quality, balanced size and quality
    Better,   // Higher quality, ≈125% file size
    Best,     // Near pristine quality, ≈170% file size
    Lighter,  // Smaller files, ≈80% file size
    Lightest, // Maximum compression, ≈50% file size
}

impl QualityPreset {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(QualityPreset::Normal),
            "better" => Ok(QualityPreset::Better),
            "best" => Ok(QualityPreset::Best),
            "lighter" => Ok(QualityPreset::Lighter),
            "lightest" => Ok(QualityPreset::Lightest),
            _ => Err(anyhow!("Invalid quality preset: {}", s)),
        }
    }

    /// Get quality value for JPEG (0-100)
    pub fn jpeg_quality(self) -> u8 {
        match self {
            QualityPreset::Normal => 75,
            QualityPreset::Better => 85,
            QualityPreset::Best => 95,
            QualityPreset::Lighter => 65,
            QualityPreset::Lightest => 50,
        }
    }

    /// PNG is lossless; presets only trade encode time for size
    pub fn png_compression(self) -> CompressionType {
        match self {
            QualityPreset::Normal | QualityPreset::Better => CompressionType::Default,
            QualityPreset::Best | QualityPreset::Lightest => CompressionType::Best,
            QualityPreset::Lighter => CompressionType::Fast,
        }
    }
}

/// Encodes decoded images into the supported output formats
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`
    pub fn compress(
        img: &DynamicImage,
        format: SupportedFormat,
        quality: QualityPreset,
    ) -> Result<Vec<u8>> {
        match format {
            SupportedFormat::Jpg | SupportedFormat::Jpeg => Self::compress_jpeg(img, quality),
            SupportedFormat::Png => Self::compress_png(img, quality),
            SupportedFormat::Gif => Self::compress_gif(img),
        }
    }

    /// JPEG has no alpha channel, so the image is flattened to RGB first
    fn compress_jpeg(img: &DynamicImage, quality: QualityPreset) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.jpeg_quality());
        rgb.write_with_encoder(encoder)?;
        Ok(buffer)
    }

    fn compress_png(img: &DynamicImage, quality: QualityPreset) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, quality.png_compression(), FilterType::Adaptive);
        img.write_with_encoder(encoder)?;
        Ok(buffer)
    }

    fn compress_gif(img: &DynamicImage) -> Result<Vec<u8>> {
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        rgba.write_to(&mut cursor, ImageFormat::Gif)?;
        Ok(buffer)
    }
}
