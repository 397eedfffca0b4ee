//! Build-scoped glue between the catalog, cache, planner and scheduler.
//!
//! One [`ImagePipeline`] lives for one build. It answers the two questions a
//! page template asks (`srcset` for an `<img>`, `background` for a CSS
//! selector), queues every resize the answer depends on, and settles all of
//! it in [`ImagePipeline::finish`].
//!
//! ## Lifecycle
//!
//! ```text
//! new()      resolve catalog, open cache (replaces the old log), start pool
//! srcset()   measure → plan → submit          (any number of times)
//! background()
//! finish()   drain resizes, close cache, summarize
//! ```
//!
//! A source that is not an image never fails the build: the caller gets the
//! raw URI back and a warning is logged. I/O failures do propagate.

use crate::cache::{CacheError, CacheStats, DimensionCache};
use crate::catalog::Catalog;
use crate::config::{BuildConfig, ConfigError, effective_threads};
use crate::imaging::ImageBackend;
use crate::naming::BuildDirs;
use crate::planner::{
    BackgroundOptions, BackgroundRules, PlanError, QueryPlanner, SourceImage, Srcset,
};
use crate::scheduler::{SchedulerError, SchedulerReport, TaskEvent, TaskScheduler};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Dimension cache: {0}")]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Per-build switches that do not belong in the config file.
#[derive(Debug)]
pub struct PipelineOptions {
    /// Replay dimensions from the previous build's cache.
    pub use_cache: bool,
    /// Progress channel for resize events.
    pub events: Option<Sender<TaskEvent>>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            events: None,
        }
    }
}

/// What a finished build did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub cache: CacheStats,
    pub tasks: SchedulerReport,
    pub upscale_warnings: usize,
}

pub struct ImagePipeline {
    backend: Arc<dyn ImageBackend>,
    cache: DimensionCache,
    scheduler: TaskScheduler,
    planner: QueryPlanner,
}

impl ImagePipeline {
    pub fn new(
        config: &BuildConfig,
        dirs: BuildDirs,
        backend: Arc<dyn ImageBackend>,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let catalog = config.catalog();
        log::info!(
            "catalog: {} sizes for {} devices",
            catalog.images().len(),
            config.devices.len()
        );

        let cache = DimensionCache::open(&config.cache_path(&dirs.source), options.use_cache)?;
        let scheduler = TaskScheduler::new(
            effective_threads(&config.processing),
            Arc::clone(&backend),
            options.events,
        )?;
        log::debug!("resizing with up to {} tasks in flight", scheduler.max_parallel());

        Ok(Self {
            backend,
            cache,
            scheduler,
            planner: QueryPlanner::new(catalog, dirs, config.quality()),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        self.planner.catalog()
    }

    pub fn dirs(&self) -> &BuildDirs {
        self.planner.dirs()
    }

    /// Measure the source behind `src`. `None` if it is not an image.
    pub fn measure(&mut self, src: &str) -> Result<Option<SourceImage>, PipelineError> {
        let path = self.planner.dirs().source_path(src);
        let dims = self.cache.measure(self.backend.as_ref(), &path)?;
        Ok(dims.map(|d| SourceImage::new(src, path, d)))
    }

    /// Plan a srcset and queue its resizes.
    pub fn plan_srcset(
        &mut self,
        src: &str,
        declared_width: Option<u32>,
    ) -> Result<Option<Srcset>, PipelineError> {
        let Some(image) = self.measure(src)? else {
            return Ok(None);
        };
        let srcset = self.planner.build_srcset(&image, declared_width);
        self.scheduler.submit(srcset.tasks.iter().cloned());
        Ok(Some(srcset))
    }

    /// `srcset` attribute value for `src`; the bare URI if it cannot be measured.
    pub fn srcset(
        &mut self,
        src: &str,
        declared_width: Option<u32>,
    ) -> Result<String, PipelineError> {
        match self.plan_srcset(src, declared_width)? {
            Some(srcset) => Ok(srcset.to_string()),
            None => {
                log::warn!("srcset: cannot measure {src}, using it as is");
                Ok(src.to_string())
            }
        }
    }

    /// Background rules for `selector`, queueing their resizes.
    ///
    /// An unmeasurable source yields a single rule pointing at `src`.
    pub fn background(
        &mut self,
        selector: &str,
        src: &str,
        options: &BackgroundOptions,
    ) -> Result<BackgroundRules, PipelineError> {
        let Some(image) = self.measure(src)? else {
            log::warn!("background: cannot measure {src}, using it as is");
            return Ok(BackgroundRules::fallback(selector, src, *options));
        };
        let rules = self.planner.build_background_rules(selector, &image, options);
        self.scheduler.submit(rules.tasks.iter().cloned());
        Ok(rules)
    }

    /// Wait for every queued resize, then persist the cache.
    ///
    /// The cache is closed even when a resize failed, so measurements made
    /// this build are not lost.
    pub fn finish(self) -> Result<BuildSummary, PipelineError> {
        let upscale_warnings = self.planner.catalog().warnings().len();
        let drained = self.scheduler.drain_and_close();
        let closed = self.cache.close();

        let tasks = drained?;
        let cache = closed?;
        log::info!("build finished: {} resized, {} skipped", tasks.completed, tasks.skipped);
        Ok(BuildSummary {
            cache,
            tasks,
            upscale_warnings,
        })
    }
}
