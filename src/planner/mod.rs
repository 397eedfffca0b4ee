//! Query planning: from a measured source image to markup text and the
//! resize tasks that text depends on.
//!
//! - [`QueryPlanner::build_srcset`] produces width descriptors for `<img
//!   srcset>` ([`srcset`]).
//! - [`QueryPlanner::build_background_rules`] produces CSS `@media` rules
//!   choosing a background image per breakpoint, orientation and resolution
//!   tier ([`background`], with condition synthesis in [`media`]).
//!
//! Planning is synchronous and never touches pixels. Every size the returned
//! text references but that is not on disk yet comes back as a
//! [`ResizeTask`](crate::imaging::ResizeTask) for the scheduler.

pub mod background;
pub mod media;
pub mod srcset;

use crate::catalog::{Catalog, Orientation};
use crate::imaging::{Dimensions, Quality, ResizeTask};
use crate::naming::BuildDirs;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub use background::{
    BackgroundOptions, BackgroundPosition, BackgroundRules, BackgroundSize, MediaRule, Offset,
    SizeDim,
};
pub use srcset::{Srcset, SrcsetCandidate};

#[derive(Error, Debug, PartialEq)]
pub enum PlanError {
    #[error("Malformed background size: {0:?}")]
    MalformedSizeSpec(String),
    #[error("Malformed background position: {0:?}")]
    MalformedPosition(String),
}

/// A source image with its measured pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    /// URI the page references, e.g. `img/hero.jpg`.
    pub src: String,
    /// Where the file lives on disk.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl SourceImage {
    pub fn new(src: impl Into<String>, path: impl Into<PathBuf>, dims: Dimensions) -> Self {
        Self {
            src: src.into(),
            path: path.into(),
            width: dims.width,
            height: dims.height,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::of(self.width, self.height)
    }
}

/// Plans srcsets and background rules against one resolved catalog.
pub struct QueryPlanner {
    catalog: Catalog,
    dirs: BuildDirs,
    quality: Quality,
}

impl QueryPlanner {
    pub fn new(catalog: Catalog, dirs: BuildDirs, quality: Quality) -> Self {
        Self {
            catalog,
            dirs,
            quality,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dirs(&self) -> &BuildDirs {
        &self.dirs
    }
}

/// Resize tasks for one planning call, deduplicated by output path and
/// filtered to outputs not yet on disk.
#[derive(Default)]
struct TaskList {
    tasks: Vec<ResizeTask>,
    seen: HashSet<PathBuf>,
}

impl TaskList {
    fn push(&mut self, task: ResizeTask) {
        if self.seen.insert(task.output.clone()) && !task.output.exists() {
            self.tasks.push(task);
        }
    }

    fn into_vec(self) -> Vec<ResizeTask> {
        self.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Gravity;

    fn task(output: PathBuf) -> ResizeTask {
        ResizeTask {
            source: "a.jpg".into(),
            output,
            width: Some(10),
            height: None,
            gravity: Gravity::Center,
            crop: false,
            quality: Quality::default(),
        }
    }

    #[test]
    fn task_list_dedupes_and_skips_existing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let existing = tmp.path().join("done.jpg");
        std::fs::write(&existing, b"").unwrap();

        let mut list = TaskList::default();
        list.push(task(tmp.path().join("a.jpg")));
        list.push(task(tmp.path().join("a.jpg")));
        list.push(task(existing));
        list.push(task(tmp.path().join("b.jpg")));

        let outputs: Vec<PathBuf> = list.into_vec().into_iter().map(|t| t.output).collect();
        assert_eq!(outputs, vec![tmp.path().join("a.jpg"), tmp.path().join("b.jpg")]);
    }

    #[test]
    fn source_orientation() {
        let landscape = SourceImage::new("a.jpg", "a.jpg", Dimensions::new(1920, 1280));
        let portrait = SourceImage::new("b.jpg", "b.jpg", Dimensions::new(1280, 1920));
        assert_eq!(landscape.orientation(), Orientation::Landscape);
        assert_eq!(portrait.orientation(), Orientation::Portrait);
    }
}
