//! Pure Rust image processing backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only, no full decode) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` at the gravity offset |
//! | Encode | format picked from the output extension, same family as the source |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{calculate_crop_offset, calculate_scaled_dimensions};
use super::params::ResizeTask;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled() && fmt.writing_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the image file extensions that can be both decoded and re-encoded.
///
/// Resized outputs keep the source extension, so a format is only useful
/// here when both directions are compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an `image` error for `path` onto the backend taxonomy.
///
/// I/O failures stay fatal; anything about the bytes themselves means the
/// file is not an image we can use.
fn classify(path: &Path, err: ImageError) -> BackendError {
    match err {
        ImageError::IoError(e) => BackendError::Io(e),
        ImageError::Decoding(_) | ImageError::Unsupported(_) | ImageError::Limits(_) => {
            BackendError::NotAnImage(path.to_path_buf())
        }
        other => BackendError::ProcessingFailed(format!("{}: {}", path.display(), other)),
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Save a DynamicImage to the given path, inferring format from extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let writer = || -> Result<BufWriter<File>, BackendError> {
        Ok(BufWriter::new(File::create(path).map_err(BackendError::Io)?))
    };
    let encode_failed =
        |e: ImageError| BackendError::ProcessingFailed(format!("{} encode failed: {}", ext, e));

    match ext.as_str() {
        "jpg" | "jpeg" => {
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(writer()?, quality as u8);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(encode_failed)
        }
        "png" => img
            .write_with_encoder(image::codecs::png::PngEncoder::new(writer()?))
            .map_err(encode_failed),
        "webp" => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(image::codecs::webp::WebPEncoder::new_lossless(writer()?))
            .map_err(encode_failed),
        "tif" | "tiff" => img
            .write_with_encoder(image::codecs::tiff::TiffEncoder::new(writer()?))
            .map_err(encode_failed),
        other => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            other
        ))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| classify(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, task: &ResizeTask) -> Result<(), BackendError> {
        let img = load_image(&task.source)?;
        let source = (img.width(), img.height());

        let (fill_w, fill_h) = calculate_scaled_dimensions(source, task.width, task.height)
            .ok_or_else(|| {
                BackendError::ProcessingFailed(format!(
                    "resize of {} has neither width nor height",
                    task.source.display()
                ))
            })?;
        let resized = img.resize_exact(fill_w, fill_h, FilterType::Lanczos3);

        let final_img = match (task.crop, task.width, task.height) {
            (true, Some(w), Some(h)) => {
                let (x, y) = calculate_crop_offset((fill_w, fill_h), (w, h), task.gravity);
                resized.crop_imm(x, y, w, h)
            }
            _ => resized,
        };

        save_image(&final_img, &task.output, task.quality.value())
    }
}
