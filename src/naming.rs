//! Output naming for resized images.
//!
//! Every generated file lives next to where its source would be served from,
//! with a suffix describing the constrained edge(s):
//!
//! - both edges → `photo-1280x800.jpg`
//! - width only → `photo-1280w.jpg`
//! - height only → `photo-800h.jpg`
//!
//! Names are deterministic so a later build can tell from the filesystem
//! alone whether an output already exists.
//!
//! URIs here are the forward-slash paths a page references (`img/photo.jpg`),
//! not filesystem paths; [`uri_to_path`] maps one onto a directory.

use std::path::{Path, PathBuf};

/// Insert `suffix` between the file stem and extension of a URI.
///
/// - `"img/photo.jpg", "-960w"` → `"img/photo-960w.jpg"`
/// - `"photo", "-960w"` → `"photo-960w"`
/// - `"img/.hidden", "-1x1"` → `"img/.hidden-1x1"`
pub fn suffixed(uri: &str, suffix: &str) -> String {
    let (dir, file) = match uri.rfind('/') {
        Some(pos) => uri.split_at(pos + 1),
        None => ("", uri),
    };
    match file.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, ext) = file.split_at(dot);
            format!("{dir}{stem}{suffix}{ext}")
        }
        _ => format!("{dir}{file}{suffix}"),
    }
}

/// URI of the resized variant of `src` for the given target edges.
///
/// With neither edge set the source URI itself is returned.
pub fn output_uri(src: &str, width: Option<u32>, height: Option<u32>) -> String {
    match (width, height) {
        (Some(w), Some(h)) => suffixed(src, &format!("-{w}x{h}")),
        (Some(w), None) => suffixed(src, &format!("-{w}w")),
        (None, Some(h)) => suffixed(src, &format!("-{h}h")),
        (None, None) => src.to_string(),
    }
}

/// Resolve a forward-slash URI against a filesystem root.
///
/// Leading slashes and empty segments are ignored, so `/img/a.jpg` and
/// `img//a.jpg` both land at `root/img/a.jpg`.
pub fn uri_to_path(root: &Path, uri: &str) -> PathBuf {
    uri.split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Forward-slash URI of `path` relative to `root`, if `path` lies under it.
pub fn path_to_uri(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Where sources are read from and generated files are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirs {
    pub source: PathBuf,
    pub output: PathBuf,
}

impl BuildDirs {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
        }
    }

    pub fn source_path(&self, uri: &str) -> PathBuf {
        uri_to_path(&self.source, uri)
    }

    pub fn output_path(&self, uri: &str) -> PathBuf {
        uri_to_path(&self.output, uri)
    }
}
