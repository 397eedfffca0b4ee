//! Build configuration module.
//!
//! Handles loading, validating, and merging `respimg.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged over it, so a
//! config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `respimg.toml` in the source directory, or any path given with `--config`.
//! A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! quality = 90              # JPEG quality for resized outputs (1-100)
//!
//! # Device breakpoints: landscape viewport in CSS pixels, the pixel
//! # densities it ships with, and whether it also occurs rotated.
//! devices = [
//!     { width = 2560, height = 1600, dppx = [1] },
//!     { width = 1366, height = 1024, dppx = [2, 1], flip = true },
//!     # ...
//! ]
//!
//! # Explicit catalog of rendered sizes. Omit to derive it from the devices.
//! # images = [{ width = 1920, height = 1200 }]
//!
//! [processing]
//! max_parallel = 4          # Max parallel resizes (omit for auto = CPU cores)
//!
//! [cache]
//! file = ".respimg-cache.jsonl"
//! ```
//!
//! ## Partial Configuration
//!
//! Tables merge key by key; arrays are replaced whole. Setting `devices`
//! replaces the entire device table:
//!
//! ```toml
//! devices = [{ width = 1280, height = 800, dppx = [2, 1], flip = true }]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::cache::CACHE_FILENAME;
use crate::catalog::{Catalog, CatalogImage, Device, default_devices};
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the source directory.
pub const CONFIG_FILENAME: &str = "respimg.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `respimg.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Encoding quality for resized outputs.
    pub quality: u32,
    /// Device breakpoint table.
    pub devices: Vec<Device>,
    /// Explicit catalog of rendered sizes; derived from `devices` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<CatalogImage>>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Dimension cache settings.
    pub cache: CacheConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            devices: default_devices(),
            images: None,
            processing: ProcessingConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.devices.is_empty() {
            return Err(ConfigError::Validation("devices must not be empty".into()));
        }
        for (i, d) in self.devices.iter().enumerate() {
            if d.width == 0 || d.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "devices[{i}]: width and height must be non-zero"
                )));
            }
            if d.dppx.iter().any(|p| !p.is_finite() || *p <= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "devices[{i}]: dppx values must be positive"
                )));
            }
        }
        if let Some(images) = &self.images {
            if images.is_empty() {
                return Err(ConfigError::Validation(
                    "images must not be empty when given".into(),
                ));
            }
            if images.iter().any(|img| img.width == 0 || img.height == 0) {
                return Err(ConfigError::Validation(
                    "images: width and height must be non-zero".into(),
                ));
            }
        }
        if self.processing.max_parallel == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_parallel must be at least 1".into(),
            ));
        }
        if self.cache.file.trim().is_empty() {
            return Err(ConfigError::Validation("cache.file must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve the device table against the configured or derived catalog.
    pub fn catalog(&self) -> Catalog {
        match &self.images {
            Some(images) => Catalog::build(&self.devices, images.clone()),
            None => Catalog::from_devices(&self.devices),
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }

    /// Cache file location; relative names live in the source directory.
    pub fn cache_path(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.cache.file)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of resizes in flight.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_parallel.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Dimension cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache file, relative to the source directory.
    pub file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: CACHE_FILENAME.to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BuildConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (arrays included) replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BuildConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    let config = resolve_config(base, overlay)?;
    log::debug!(
        "config: {} devices, quality {}, from {}",
        config.devices.len(),
        config.quality,
        path.display()
    );
    Ok(config)
}

/// Returns a fully-commented stock `respimg.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# respimg Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Encoding quality for resized outputs (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Device breakpoints
# ---------------------------------------------------------------------------
# Each device is a landscape viewport in CSS pixels, the pixel densities
# (dppx) it ships with, and whether it also occurs rotated (flip). Density 1
# is always resolved as well, so a high-density layout resized down on a
# plain display never gets an upscaled image.
#
# Setting `devices` replaces the whole table.
devices = [
    { width = 2560, height = 1600, dppx = [1] },
    { width = 1920, height = 1200, dppx = [1] },
    { width = 1680, height = 1050, dppx = [1] },
    { width = 1440, height = 900, dppx = [2, 1] },
    { width = 1366, height = 1024, dppx = [2, 1], flip = true },
    { width = 1280, height = 800, dppx = [2, 1.5, 1], flip = true },
    { width = 1024, height = 768, dppx = [2, 1], flip = true },
    { width = 960, height = 600, dppx = [3, 2], flip = true },
    { width = 800, height = 600, dppx = [1] },
    { width = 768, height = 432, dppx = [4, 3, 2.5], flip = true },
    { width = 690, height = 412, dppx = [3.5, 2], flip = true },
    { width = 640, height = 360, dppx = [4, 3, 2, 1.5], flip = true },
    { width = 480, height = 320, dppx = [3, 2.4, 2, 1.5, 1], flip = true },
]

# Explicit catalog of rendered sizes. When omitted, one size per device and
# listed density is derived from the table above.
# images = [{ width = 1920, height = 1200 }, { width = 1280, height = 800 }]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel resizes.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_parallel = 4

# ---------------------------------------------------------------------------
# Dimension cache
# ---------------------------------------------------------------------------
[cache]
# Measured source dimensions are kept here between builds, relative to the
# source directory. Pass --no-cache to ignore it for one build.
file = ".respimg-cache.jsonl"
"##
}
