//! # respimg
//!
//! Responsive image sets for static sites. A table of target devices is
//! resolved once per build against a catalog of rendered image sizes; from
//! that, every image request yields either `srcset` width descriptors or a
//! set of CSS `@media` rules, plus the resizes the emitted text depends on.
//!
//! # Architecture
//!
//! ```text
//! config ─→ Catalog ──────────────┐
//!                                 ▼
//! src URI ─→ DimensionCache ─→ QueryPlanner ─→ srcset / CSS text
//!                                 │
//!                                 ▼ ResizeTask
//!                           TaskScheduler ─→ ImageBackend ─→ dist/
//! ```
//!
//! Planning is synchronous; resizes run on a bounded pool in the background
//! and are awaited once, when the build finishes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Device table → breakpoint groups, two-pass orientation mirroring |
//! | [`cache`] | Source dimensions persisted between builds, single writer thread |
//! | [`scheduler`] | Bounded-concurrency FIFO executor for resize tasks |
//! | [`planner`] | `srcset` descriptors and background `@media` rules |
//! | [`pipeline`] | One build: catalog + cache + planner + scheduler |
//! | [`site`] | Whole-directory build: discovery, manifest, preview |
//! | [`config`] | `respimg.toml` loading, merging over stock defaults, validation |
//! | [`imaging`] | Probe/resize backend trait and the pure-Rust implementation |
//! | [`naming`] | `-{w}w` / `-{h}h` / `-{w}x{h}` output naming, URI ↔ path |
//! | [`markup`] | Maud rendering of `<img>`, `<style>` and the preview page |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Two-Pass Catalog
//!
//! Rotatable devices need portrait images. Landscape breakpoints are
//! resolved first; the transposed size of every image they picked is added
//! to the catalog, and only then are portrait breakpoints resolved. Portrait
//! choices therefore never depend on device order.
//!
//! ## Existence as the Build Cache
//!
//! Output names are derived from the source URI and the target size only, so
//! "already rendered" is a file-exists check. Deleting an output forces it
//! to be rendered again; nothing else has to be invalidated.
//!
//! ## Dimension Cache Keyed by Path
//!
//! Measured sizes are keyed by source path alone. Replacing a source image
//! with a different size under the same name keeps the old dimensions until
//! a build runs with `--no-cache`.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod imaging;
pub mod markup;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod planner;
pub mod scheduler;
pub mod site;

#[cfg(test)]
pub(crate) mod test_helpers;
