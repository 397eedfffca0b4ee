//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the query planner (which decides which outputs a page needs) and the
//! [`backend`](super::backend) (which does the pixel work), so backends can be
//! swapped for a mock in tests without touching planning logic.
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Gravity`]: Anchor used when a fill-resized image is cropped to its target box.
//! - [`ResizeTask`]: One deferred resize: source, output, target box, gravity, crop.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Crop anchor, named after the compass points ImageMagick uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    #[default]
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
}

/// Horizontal or vertical placement along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Gravity {
    /// Build a gravity from independent horizontal and vertical anchors.
    pub fn from_anchors(x: Anchor, y: Anchor) -> Self {
        match (x, y) {
            (Anchor::Start, Anchor::Start) => Gravity::NorthWest,
            (Anchor::Middle, Anchor::Start) => Gravity::North,
            (Anchor::End, Anchor::Start) => Gravity::NorthEast,
            (Anchor::Start, Anchor::Middle) => Gravity::West,
            (Anchor::Middle, Anchor::Middle) => Gravity::Center,
            (Anchor::End, Anchor::Middle) => Gravity::East,
            (Anchor::Start, Anchor::End) => Gravity::SouthWest,
            (Anchor::Middle, Anchor::End) => Gravity::South,
            (Anchor::End, Anchor::End) => Gravity::SouthEast,
        }
    }

    /// Split back into `(horizontal, vertical)` anchors.
    pub fn anchors(self) -> (Anchor, Anchor) {
        match self {
            Gravity::NorthWest => (Anchor::Start, Anchor::Start),
            Gravity::North => (Anchor::Middle, Anchor::Start),
            Gravity::NorthEast => (Anchor::End, Anchor::Start),
            Gravity::West => (Anchor::Start, Anchor::Middle),
            Gravity::Center => (Anchor::Middle, Anchor::Middle),
            Gravity::East => (Anchor::End, Anchor::Middle),
            Gravity::SouthWest => (Anchor::Start, Anchor::End),
            Gravity::South => (Anchor::Middle, Anchor::End),
            Gravity::SouthEast => (Anchor::End, Anchor::End),
        }
    }
}

/// A deferred resize of one source image into one output file.
///
/// At least one of `width` / `height` is set. With both set the source is
/// resized to *cover* the box (the smaller edge matches, the other may
/// overflow) and, when `crop` is true, cut down to exactly `width × height`
/// around `gravity`. With only one set the other edge follows the aspect ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeTask {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub gravity: Gravity,
    pub crop: bool,
    pub quality: Quality,
}

impl fmt::Display for ResizeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.width, self.height) {
            (Some(w), Some(h)) => write!(f, "{}x{}", w, h)?,
            (Some(w), None) => write!(f, "{}w", w)?,
            (None, Some(h)) => write!(f, "{}h", h)?,
            (None, None) => write!(f, "original")?,
        }
        if self.crop {
            write!(f, " (cropped)")?;
        }
        write!(f, " → {}", self.output.display())
    }
}
