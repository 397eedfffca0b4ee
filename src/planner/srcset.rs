//! Width descriptors for `<img srcset>`.

use super::{QueryPlanner, SourceImage, TaskList};
use crate::imaging::{Gravity, ResizeTask};
use crate::naming::output_uri;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrcsetCandidate {
    pub uri: String,
    pub width: u32,
}

/// A srcset and the resizes needed to make every candidate exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Srcset {
    pub candidates: Vec<SrcsetCandidate>,
    pub tasks: Vec<ResizeTask>,
}

impl fmt::Display for Srcset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.candidates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}w", c.uri, c.width)?;
        }
        Ok(())
    }
}

impl QueryPlanner {
    /// Srcset for `image` displayed at most `declared_width` pixels wide.
    ///
    /// Every catalog width strictly below the limit becomes a `-{w}w`
    /// candidate, widest first, followed by the original at its measured
    /// width. The limit never exceeds the measured width, so nothing is
    /// upscaled.
    pub fn build_srcset(&self, image: &SourceImage, declared_width: Option<u32>) -> Srcset {
        let limit = declared_width.map_or(image.width, |w| w.min(image.width));

        let mut widths: Vec<u32> = self
            .catalog
            .images()
            .iter()
            .map(|img| img.width)
            .filter(|&w| w < limit)
            .collect();
        widths.dedup();

        let mut tasks = TaskList::default();
        let mut candidates: Vec<SrcsetCandidate> = widths
            .into_iter()
            .map(|width| {
                let uri = output_uri(&image.src, Some(width), None);
                tasks.push(ResizeTask {
                    source: image.path.clone(),
                    output: self.dirs.output_path(&uri),
                    width: Some(width),
                    height: None,
                    gravity: Gravity::Center,
                    crop: false,
                    quality: self.quality,
                });
                SrcsetCandidate { uri, width }
            })
            .collect();
        candidates.push(SrcsetCandidate {
            uri: image.src.clone(),
            width: image.width,
        });

        Srcset {
            candidates,
            tasks: tasks.into_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogImage, Device};
    use crate::imaging::{Dimensions, Quality};
    use crate::naming::BuildDirs;
    use tempfile::TempDir;

    fn planner(tmp: &TempDir, images: &[(u32, u32)]) -> QueryPlanner {
        let devices = vec![Device::new(1920, 1280, &[1.0], false)];
        let catalog = Catalog::build(
            &devices,
            images.iter().map(|&(w, h)| CatalogImage::new(w, h)).collect(),
        );
        QueryPlanner::new(
            catalog,
            BuildDirs::new(tmp.path().join("src"), tmp.path().join("out")),
            Quality::default(),
        )
    }

    fn source(tmp: &TempDir, w: u32, h: u32) -> SourceImage {
        SourceImage::new("img.jpg", tmp.path().join("src/img.jpg"), Dimensions::new(w, h))
    }

    #[test]
    fn srcset_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, &[(1280, 800), (960, 640), (1920, 1280)]);

        let srcset = planner.build_srcset(&source(&tmp, 1920, 1280), Some(1920));

        assert_eq!(
            srcset.to_string(),
            "img-1280w.jpg 1280w, img-960w.jpg 960w, img.jpg 1920w"
        );
        let outputs: Vec<_> = srcset.tasks.iter().map(|t| t.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                tmp.path().join("out/img-1280w.jpg"),
                tmp.path().join("out/img-960w.jpg"),
            ]
        );
        assert!(srcset.tasks.iter().all(|t| t.height.is_none() && !t.crop));
        assert!(
            srcset
                .tasks
                .iter()
                .all(|t| t.source == tmp.path().join("src/img.jpg"))
        );
    }

    #[test]
    fn declared_width_limits_candidates() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, &[(1280, 800), (960, 640), (1920, 1280)]);

        let srcset = planner.build_srcset(&source(&tmp, 1920, 1280), Some(1000));

        assert_eq!(srcset.to_string(), "img-960w.jpg 960w, img.jpg 1920w");
    }

    #[test]
    fn declared_width_above_measured_is_capped() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, &[(1280, 800), (960, 640)]);

        let srcset = planner.build_srcset(&source(&tmp, 1000, 700), Some(4000));

        assert_eq!(srcset.to_string(), "img-960w.jpg 960w, img.jpg 1000w");
    }

    #[test]
    fn small_source_has_only_itself() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, &[(1280, 800), (960, 640)]);

        let srcset = planner.build_srcset(&source(&tmp, 640, 480), None);

        assert_eq!(srcset.to_string(), "img.jpg 640w");
        assert!(srcset.tasks.is_empty());
    }

    #[test]
    fn shared_widths_appear_once() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, &[(1280, 800), (1280, 720), (960, 640)]);

        let srcset = planner.build_srcset(&source(&tmp, 1920, 1280), None);

        assert_eq!(
            srcset.to_string(),
            "img-1280w.jpg 1280w, img-960w.jpg 960w, img.jpg 1920w"
        );
        assert_eq!(srcset.tasks.len(), 2);
    }

    #[test]
    fn existing_outputs_produce_no_task() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, &[(1280, 800), (960, 640)]);
        std::fs::create_dir_all(tmp.path().join("out")).unwrap();
        std::fs::write(tmp.path().join("out/img-960w.jpg"), b"").unwrap();

        let srcset = planner.build_srcset(&source(&tmp, 1920, 1280), None);

        assert_eq!(srcset.candidates.len(), 3);
        assert_eq!(srcset.tasks.len(), 1);
        assert_eq!(srcset.tasks[0].width, Some(1280));
    }
}
