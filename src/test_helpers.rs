//! Shared test utilities: synthetic images and source trees on disk.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = source_tree(&[("img/hero.jpg", 400, 300), ("logo.png", 64, 32)]);
//! let dirs = build_dirs(&tmp);
//! assert!(dirs.source_path("img/hero.jpg").exists());
//! ```

use crate::naming::BuildDirs;
use image::{ImageFormat, Rgb, RgbImage};
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Write a `width × height` gradient JPEG, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    create_test_image(path, width, height, ImageFormat::Jpeg);
}

/// Write a `width × height` gradient PNG, creating parent directories.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    create_test_image(path, width, height, ImageFormat::Png);
}

fn create_test_image(path: &Path, width: u32, height: u32, format: ImageFormat) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, format)
        .unwrap();
}

// =========================================================================
// Source trees
// =========================================================================

/// Temp dir with `src/` holding the given images (by extension) and an
/// empty `dist/` sibling path.
pub fn source_tree(images: &[(&str, u32, u32)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for &(uri, w, h) in images {
        let path = tmp.path().join("src").join(uri);
        if uri.ends_with(".png") {
            create_test_png(&path, w, h);
        } else {
            create_test_jpeg(&path, w, h);
        }
    }
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    tmp
}

/// `src/` → `dist/` inside a [`source_tree`].
pub fn build_dirs(tmp: &TempDir) -> BuildDirs {
    BuildDirs::new(tmp.path().join("src"), tmp.path().join("dist"))
}

/// Pixel size of an image on disk.
pub fn dims_of(path: &Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}
