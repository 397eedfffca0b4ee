//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two capabilities the rest of the
//! crate needs from an imaging library: *identify* (probe the pixel size of a
//! file) and *resize* (materialize one [`ResizeTask`]).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! `MockBackend` in this module, which records calls instead of touching
//! pixels.

use super::params::ResizeTask;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file exists but is not an image we can read. Non-fatal for probing.
    #[error("Not an image: {}", .0.display())]
    NotAnImage(PathBuf),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
///
/// Backends are shared between the orchestration thread and the scheduler's
/// worker pool, hence `Send + Sync`.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions. Returns [`BackendError::NotAnImage`] for files
    /// that exist but cannot be decoded as an image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Execute a resize task, writing `task.output`.
    fn resize(&self, task: &ResizeTask) -> Result<(), BackendError>;
}
