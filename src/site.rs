//! Whole-directory builds.
//!
//! The `build` command's pipeline: walk the source tree for images, plan a
//! srcset for each through an [`ImagePipeline`], and write two artifacts to
//! the output directory:
//!
//! ```text
//! dist/
//! ├── responsive.json        # BuildManifest: srcset and variants per image
//! ├── index.html             # Preview page rendering every <img srcset>
//! └── img/
//!     ├── hero-1280w.jpg     # Resized variants, mirroring the source tree
//!     └── hero-960w.jpg
//! ```
//!
//! Hidden entries and the output directory itself (when it lives inside the
//! source tree) are never walked. Files with unsupported extensions are not
//! probed at all.

use crate::imaging::has_supported_extension;
use crate::markup;
use crate::naming::{BuildDirs, path_to_uri};
use crate::pipeline::{ImagePipeline, PipelineError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

pub const MANIFEST_FILENAME: &str = "responsive.json";
pub const PREVIEW_FILENAME: &str = "index.html";

/// One source image and the srcset planned for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub srcset: String,
    /// URIs of the resized variants, widest first.
    pub variants: Vec<String>,
}

/// Everything a build produced, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub images: Vec<ManifestEntry>,
    /// Sources with an image extension that turned out not to be images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<String>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// URIs of every supported image under the source directory, sorted.
pub fn discover_images(dirs: &BuildDirs) -> io::Result<Vec<String>> {
    let output = dirs.output.canonicalize().ok();
    let is_output = |entry: &DirEntry| {
        entry.file_type().is_dir()
            && output.as_deref().is_some_and(|out| {
                entry
                    .path()
                    .canonicalize()
                    .is_ok_and(|p| p.as_path() == out)
            })
    };

    let mut uris = Vec::new();
    let walker = WalkDir::new(&dirs.source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_output(e));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() || !has_supported_extension(entry.path()) {
            continue;
        }
        if let Some(uri) = path_to_uri(&dirs.source, entry.path()) {
            uris.push(uri);
        }
    }
    log::debug!("found {} images under {}", uris.len(), dirs.source.display());
    Ok(uris)
}

/// Plan a srcset for every discovered image.
///
/// Resizes are queued on the pipeline; call [`ImagePipeline::finish`]
/// afterwards to wait for them.
pub fn plan_directory(pipeline: &mut ImagePipeline) -> Result<BuildManifest, PipelineError> {
    let mut manifest = BuildManifest::default();
    for src in discover_images(pipeline.dirs())? {
        let Some(image) = pipeline.measure(&src)? else {
            manifest.unreadable.push(src);
            continue;
        };
        let Some(srcset) = pipeline.plan_srcset(&src, None)? else {
            continue;
        };
        let variants = match srcset.candidates.split_last() {
            Some((_, resized)) => resized.iter().map(|c| c.uri.clone()).collect(),
            None => Vec::new(),
        };
        manifest.images.push(ManifestEntry {
            src,
            width: image.width,
            height: image.height,
            srcset: srcset.to_string(),
            variants,
        });
    }
    Ok(manifest)
}

/// Write `responsive.json` and the `index.html` preview.
pub fn write_outputs(manifest: &BuildManifest, output_dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(output_dir)?;
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(output_dir.join(MANIFEST_FILENAME), json)?;
    let html = markup::render_preview(manifest).into_string();
    fs::write(output_dir.join(PREVIEW_FILENAME), html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogImage, Device};
    use crate::config::BuildConfig;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockBackend;
    use crate::pipeline::PipelineOptions;
    use crate::test_helpers::{build_dirs, dims_of, source_tree};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    // =========================================================================
    // discover_images
    // =========================================================================

    #[test]
    fn discover_finds_nested_images_sorted() {
        let tmp = TempDir::new().unwrap();
        let dirs = BuildDirs::new(tmp.path().join("src"), tmp.path().join("dist"));
        touch(&tmp.path().join("src/b.jpg"));
        touch(&tmp.path().join("src/a.png"));
        touch(&tmp.path().join("src/img/c.webp"));
        touch(&tmp.path().join("src/notes.md"));

        assert_eq!(
            discover_images(&dirs).unwrap(),
            vec!["a.png", "b.jpg", "img/c.webp"]
        );
    }

    #[test]
    fn discover_skips_hidden_entries() {
        let tmp = TempDir::new().unwrap();
        let dirs = BuildDirs::new(tmp.path().join("src"), tmp.path().join("dist"));
        touch(&tmp.path().join("src/.drafts/a.jpg"));
        touch(&tmp.path().join("src/.b.jpg"));
        touch(&tmp.path().join("src/c.jpg"));

        assert_eq!(discover_images(&dirs).unwrap(), vec!["c.jpg"]);
    }

    #[test]
    fn discover_skips_output_inside_source() {
        let tmp = TempDir::new().unwrap();
        let dirs = BuildDirs::new(tmp.path().join("src"), tmp.path().join("src/dist"));
        touch(&tmp.path().join("src/a.jpg"));
        touch(&tmp.path().join("src/dist/a-960w.jpg"));

        assert_eq!(discover_images(&dirs).unwrap(), vec!["a.jpg"]);
    }

    #[test]
    fn discover_missing_source_is_error() {
        let tmp = TempDir::new().unwrap();
        let dirs = BuildDirs::new(tmp.path().join("nope"), tmp.path().join("dist"));
        assert!(discover_images(&dirs).is_err());
    }

    // =========================================================================
    // plan_directory / write_outputs
    // =========================================================================

    #[test]
    fn plan_directory_builds_manifest() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        touch(&src.join("img/hero.jpg"));
        touch(&src.join("broken.jpg"));

        let backend = MockBackend::new().touching_outputs();
        backend.set_dimensions(src.join("img/hero.jpg"), 1920, 1280);
        backend.mark_not_image(src.join("broken.jpg"));

        let config = BuildConfig {
            devices: vec![Device::new(1280, 800, &[1.0], false)],
            images: Some(vec![CatalogImage::new(1280, 800), CatalogImage::new(960, 640)]),
            ..BuildConfig::default()
        };
        let mut pipeline = ImagePipeline::new(
            &config,
            BuildDirs::new(&src, tmp.path().join("dist")),
            Arc::new(backend),
            PipelineOptions::default(),
        )
        .unwrap();

        let manifest = plan_directory(&mut pipeline).unwrap();
        let summary = pipeline.finish().unwrap();

        assert_eq!(manifest.unreadable, vec!["broken.jpg"]);
        assert_eq!(
            manifest.images,
            vec![ManifestEntry {
                src: "img/hero.jpg".into(),
                width: 1920,
                height: 1280,
                srcset: "img/hero-1280w.jpg 1280w, img/hero-960w.jpg 960w, img/hero.jpg 1920w"
                    .into(),
                variants: vec!["img/hero-1280w.jpg".into(), "img/hero-960w.jpg".into()],
            }]
        );
        assert_eq!(summary.tasks.completed, 2);
        assert!(tmp.path().join("dist/img/hero-960w.jpg").exists());
    }

    #[test]
    fn write_outputs_creates_manifest_and_preview() {
        let tmp = TempDir::new().unwrap();
        let manifest = BuildManifest {
            images: vec![ManifestEntry {
                src: "a.jpg".into(),
                width: 800,
                height: 600,
                srcset: "a-480w.jpg 480w, a.jpg 800w".into(),
                variants: vec!["a-480w.jpg".into()],
            }],
            unreadable: vec![],
        };
        let out = tmp.path().join("dist");

        write_outputs(&manifest, &out).unwrap();

        let json = fs::read_to_string(out.join(MANIFEST_FILENAME)).unwrap();
        let parsed: BuildManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
        assert!(!json.contains("unreadable"));

        let html = fs::read_to_string(out.join(PREVIEW_FILENAME)).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"srcset="a-480w.jpg 480w, a.jpg 800w""#));
    }

    #[test]
    fn build_with_real_backend_renders_variants() {
        let tmp = source_tree(&[("img/wide.jpg", 400, 300), ("tiny.png", 40, 30)]);
        fs::write(tmp.path().join("src/fake.jpg"), "not really a jpeg").unwrap();
        let dirs = build_dirs(&tmp);
        let config = BuildConfig {
            devices: vec![Device::new(200, 150, &[1.0], false)],
            images: Some(vec![CatalogImage::new(200, 150), CatalogImage::new(100, 75)]),
            ..BuildConfig::default()
        };
        let mut pipeline = ImagePipeline::new(
            &config,
            dirs.clone(),
            Arc::new(RustBackend::new()),
            PipelineOptions::default(),
        )
        .unwrap();

        let manifest = plan_directory(&mut pipeline).unwrap();
        pipeline.finish().unwrap();
        write_outputs(&manifest, &dirs.output).unwrap();

        assert_eq!(manifest.unreadable, vec!["fake.jpg"]);
        assert_eq!(manifest.images.len(), 2);
        assert_eq!(manifest.images[1].src, "tiny.png");
        assert!(manifest.images[1].variants.is_empty());
        assert_eq!(dims_of(&dirs.output_path("img/wide-200w.jpg")), (200, 150));
        assert_eq!(dims_of(&dirs.output_path("img/wide-100w.jpg")), (100, 75));
        assert!(dirs.output.join(MANIFEST_FILENAME).exists());
    }
}
