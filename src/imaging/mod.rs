//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3 fill, optional gravity crop |
//! | **Encode** | same format as the source (JPEG, PNG, TIFF, WebP) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Probe/resize policy on top of the backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use operations::{execute_resize, probe_dimensions};
pub use params::{Anchor, Gravity, Quality, ResizeTask};
pub use rust_backend::{RustBackend, has_supported_extension, supported_input_extensions};
