//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Catalog
//!
//! ```text
//! Catalog (4 sizes)
//!     2560x1600
//!     1920x1200
//!     ...
//!
//! Landscape
//! 001 1366x1024
//!     @2x   2732x2048
//!     @1x   1366x1024
//! 002 1280x800
//!     @2x   2560x1600
//!     @1.5x 1920x1200
//!
//! Portrait
//! 001 1024x1366
//!     @2x   2048x2732
//!
//! Warnings
//!     960x600 @3x needs 2880x1800 but the largest match is 2560x1600
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 img/hero.jpg (1920x1280)
//!     2 variants: img/hero-1280w.jpg, img/hero-960w.jpg
//! 002 logo.png (200x80)
//!     no variants
//!
//! Not images
//!     broken.jpg
//! ```
//!
//! ## Resize progress
//!
//! ```text
//!     resized 1280w → dist/img/hero-1280w.jpg
//!     exists  960w → dist/img/hero-960w.jpg
//!     FAILED  640w → dist/img/hero-640w.jpg: Processing failed: ...
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::catalog::{BreakpointGroup, Catalog};
use crate::pipeline::BuildSummary;
use crate::planner::media::format_number;
use crate::scheduler::TaskEvent;
use crate::site::BuildManifest;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Catalog
// ============================================================================

fn group_lines(title: &str, groups: &[BreakpointGroup], lines: &mut Vec<String>) {
    if groups.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(title.to_string());
    for (i, group) in groups.iter().enumerate() {
        lines.push(format!(
            "{} {}x{}",
            format_index(i + 1),
            group.width,
            group.height
        ));
        for entry in &group.entries {
            lines.push(format!(
                "{}{:<5} {}",
                indent(1),
                format!("@{}x", format_number(entry.dppx)),
                entry.image
            ));
        }
    }
}

/// Format the resolved catalog: image sizes, both breakpoint tables, and
/// upscale warnings.
pub fn format_catalog(catalog: &Catalog) -> Vec<String> {
    let mut lines = vec![format!("Catalog ({} sizes)", catalog.images().len())];
    for image in catalog.images() {
        lines.push(format!("{}{}", indent(1), image));
    }

    group_lines("Landscape", &catalog.table().landscape, &mut lines);
    group_lines("Portrait", &catalog.table().portrait, &mut lines);

    if !catalog.warnings().is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in catalog.warnings() {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }
    lines
}

pub fn print_catalog(catalog: &Catalog) {
    print_lines(&format_catalog(catalog));
}

// ============================================================================
// Resize progress
// ============================================================================

/// Format a single scheduler event as display lines.
///
/// Queued and started tasks are silent; only settled tasks are shown.
pub fn format_task_event(event: &TaskEvent) -> Vec<String> {
    match event {
        TaskEvent::Queued(_) | TaskEvent::Started(_) => Vec::new(),
        TaskEvent::Skipped(task) => vec![format!("{}exists  {}", indent(1), task)],
        TaskEvent::Finished(task) => vec![format!("{}resized {}", indent(1), task)],
        TaskEvent::Failed { task, error } => {
            vec![format!("{}FAILED  {}: {}", indent(1), task, error)]
        }
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format the per-image listing of a directory build.
pub fn format_build_manifest(manifest: &BuildManifest) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in manifest.images.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}x{})",
            format_index(i + 1),
            entry.src,
            entry.width,
            entry.height
        ));
        if entry.variants.is_empty() {
            lines.push(format!("{}no variants", indent(1)));
        } else {
            lines.push(format!(
                "{}{} variants: {}",
                indent(1),
                entry.variants.len(),
                entry.variants.join(", ")
            ));
        }
    }
    if !manifest.unreadable.is_empty() {
        lines.push(String::new());
        lines.push("Not images".to_string());
        for src in &manifest.unreadable {
            lines.push(format!("{}{}", indent(1), src));
        }
    }
    lines
}

pub fn print_build_manifest(manifest: &BuildManifest) {
    print_lines(&format_build_manifest(manifest));
}

/// Format the closing summary of a build.
///
/// ```text
/// Cache: 3 cached, 2 measured (5 total)
/// Resized: 4, already present: 6
/// Upscale warnings: 1
/// ```
pub fn format_build_summary(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Cache: {}", summary.cache),
        format!(
            "Resized: {}, already present: {}",
            summary.tasks.completed, summary.tasks.skipped
        ),
    ];
    if summary.upscale_warnings > 0 {
        lines.push(format!("Upscale warnings: {}", summary.upscale_warnings));
    }
    lines
}

pub fn print_build_summary(summary: &BuildSummary) {
    print_lines(&format_build_summary(summary));
}
