//! High-level image operations.
//!
//! These functions wrap the raw backend calls with the policy the rest of the
//! crate relies on: probing treats "not an image" as absent dimensions, and
//! resizing makes sure the output directory exists first.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::ResizeTask;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Probe image dimensions using the backend.
///
/// `Ok(None)` means the file exists but is not a usable image; callers
/// decide their own fallback. Every other failure is propagated.
pub fn probe_dimensions(backend: &dyn ImageBackend, path: &Path) -> Result<Option<Dimensions>> {
    match backend.identify(path) {
        Ok(dims) => Ok(Some(dims)),
        Err(BackendError::NotAnImage(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run one resize task, creating the output's parent directory if needed.
pub fn execute_resize(backend: &dyn ImageBackend, task: &ResizeTask) -> Result<()> {
    if let Some(parent) = task.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    backend.resize(task)
}
