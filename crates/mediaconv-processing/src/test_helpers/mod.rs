//! Test helpers for pipeline unit tests
//!
//! An in-memory attachment store and image fixtures, so the pipeline can be
//! tested without a database.

pub mod mock_store;

pub use mock_store::*;

use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;

/// Write a small PNG at `path`, creating parent directories
pub fn write_test_png(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    RgbImage::from_pixel(12, 10, Rgb([200, 40, 90]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}
