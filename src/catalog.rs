//! Breakpoint catalog: which pre-rendered size serves which device.
//!
//! The catalog is the set of sizes ([`CatalogImage`]) source images get
//! rendered at. Resolving it against the device table produces a
//! [`QueryTable`]: for every device footprint and every pixel density the
//! device ships with, the smallest catalog image that covers the footprint
//! without upscaling.
//!
//! ## Resolution
//!
//! The effective footprint of a device at density `p` is
//! `(width × p, height × p)`. Density 1 is always resolved, even when the
//! device table does not list it, so a high-density layout resized down on a
//! plain display never gets an upscaled image.
//!
//! The catalog is walked width-descending (ties height-descending) and the
//! first image accepted by [`select_image`] wins. Width and height must
//! each cover the footprint, and the width-sorted walk can hide a taller
//! image behind a narrower one, so besides the plain "narrowest wide-enough
//! image" case the walk also stops at an image that is tall enough when the
//! next one is still wide enough but too short.
//!
//! When nothing covers the footprint, the best available image is used and an
//! [`UpscaleWarning`] is recorded.
//!
//! ## Mirrored sizes
//!
//! Devices with `can_flip` also get portrait breakpoints (the transposed
//! footprint). The portrait footprint needs portrait-shaped images, so the
//! transposed size of every image chosen for a flip device's landscape
//! breakpoints joins the catalog. This runs in two passes: landscape
//! breakpoints are resolved against the initial catalog while collecting the
//! mirrored sizes, then the grown catalog resolves the portrait breakpoints.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One physical breakpoint from the device table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Device {
    /// Landscape viewport width in CSS pixels.
    pub width: u32,
    /// Landscape viewport height in CSS pixels.
    pub height: u32,
    /// Device pixel ratios this breakpoint ships with.
    #[serde(default = "default_dppx")]
    pub dppx: Vec<f64>,
    /// Whether the breakpoint also occurs rotated (portrait).
    #[serde(rename = "flip", default)]
    pub can_flip: bool,
}

fn default_dppx() -> Vec<f64> {
    vec![1.0]
}

impl Device {
    pub fn new(width: u32, height: u32, dppx: &[f64], can_flip: bool) -> Self {
        Self {
            width,
            height,
            dppx: dppx.to_vec(),
            can_flip,
        }
    }

    /// Densities to resolve: the listed ones plus 1, deduplicated, descending.
    pub fn resolution_tiers(&self) -> Vec<f64> {
        let mut tiers = self.dppx.clone();
        tiers.push(1.0);
        normalize_tiers(tiers)
    }
}

fn normalize_tiers(mut tiers: Vec<f64>) -> Vec<f64> {
    tiers.sort_by(|a, b| b.total_cmp(a));
    tiers.dedup();
    tiers
}

/// A size source images are rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogImage {
    pub width: u32,
    pub height: u32,
}

impl CatalogImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn transposed(self) -> Self {
        Self::new(self.height, self.width)
    }

    fn covers(self, w: f64, h: f64) -> bool {
        self.width as f64 >= w && self.height as f64 >= h
    }
}

impl fmt::Display for CatalogImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Width-descending, then height-descending.
fn by_size_desc(a: &CatalogImage, b: &CatalogImage) -> Ordering {
    b.width.cmp(&a.width).then(b.height.cmp(&a.height))
}

/// Sort descending and drop duplicate sizes.
fn normalize_catalog(mut images: Vec<CatalogImage>) -> Vec<CatalogImage> {
    images.sort_by(by_size_desc);
    images.dedup();
    images
}

/// One device footprint resolved at one density.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointEntry {
    pub device_width: u32,
    pub device_height: u32,
    pub dppx: f64,
    pub image: CatalogImage,
}

/// One breakpoint footprint with its entries ordered by descending density.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointGroup {
    pub width: u32,
    pub height: u32,
    pub entries: Vec<BreakpointEntry>,
}

/// Landscape and portrait breakpoint groups, each ordered width-descending
/// then height-descending. Media conditions are emitted in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    pub landscape: Vec<BreakpointGroup>,
    pub portrait: Vec<BreakpointGroup>,
}

/// Orientation of a viewport or an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn of(width: u32, height: u32) -> Self {
        if width >= height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Orientation::Landscape => Orientation::Portrait,
            Orientation::Portrait => Orientation::Landscape,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl QueryTable {
    pub fn groups(&self, orientation: Orientation) -> &[BreakpointGroup] {
        match orientation {
            Orientation::Landscape => &self.landscape,
            Orientation::Portrait => &self.portrait,
        }
    }
}

/// A footprint no catalog image fully covers.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleWarning {
    pub device_width: u32,
    pub device_height: u32,
    pub dppx: f64,
    pub required_width: f64,
    pub required_height: f64,
    pub chosen: CatalogImage,
}

impl fmt::Display for UpscaleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @{}x needs {}x{} but the largest match is {}",
            self.device_width,
            self.device_height,
            self.dppx,
            self.required_width,
            self.required_height,
            self.chosen
        )
    }
}

/// The resolved catalog: final image set, query table and warnings.
#[derive(Debug, Clone)]
pub struct Catalog {
    images: Vec<CatalogImage>,
    table: QueryTable,
    warnings: Vec<UpscaleWarning>,
}

/// Derive the initial catalog from the device table: one size per device ×
/// listed density (the implicit density 1 is not added here).
pub fn derive_catalog(devices: &[Device]) -> Vec<CatalogImage> {
    let images = devices
        .iter()
        .flat_map(|d| {
            d.dppx.iter().map(move |&p| {
                CatalogImage::new(
                    (d.width as f64 * p).round() as u32,
                    (d.height as f64 * p).round() as u32,
                )
            })
        })
        .collect();
    normalize_catalog(images)
}

/// Pick the image for footprint `(w, h)` from a catalog sorted by
/// [`by_size_desc`]. Returns `None` only for an empty catalog.
pub fn select_image(sorted: &[CatalogImage], w: f64, h: f64) -> Option<CatalogImage> {
    // Nothing is wide enough: the largest image is the least upscaled.
    let largest = *sorted.first()?;
    if (largest.width as f64) < w {
        return Some(largest);
    }
    sorted.iter().enumerate().find_map(|(i, &img)| {
        let accept = match sorted.get(i + 1) {
            None => true,
            Some(next) => {
                let next_w = next.width as f64;
                let taller_than_next = next_w >= w && img.height as f64 >= h && (next.height as f64) < h;
                let narrowest_wide_enough = img.width as f64 >= w && next_w < w;
                taller_than_next || narrowest_wide_enough
            }
        };
        accept.then_some(img)
    })
}

/// A footprint waiting to be resolved, with its density tiers.
struct Footprint {
    width: u32,
    height: u32,
    tiers: Vec<f64>,
    mirrors: bool,
}

/// Merge devices that share a footprint, unioning their density tiers.
fn collect_footprints(devices: &[Device], transpose: bool) -> Vec<Footprint> {
    let mut footprints: Vec<Footprint> = Vec::new();
    for d in devices {
        if transpose && !d.can_flip {
            continue;
        }
        let (width, height) = if transpose {
            (d.height, d.width)
        } else {
            (d.width, d.height)
        };
        match footprints
            .iter_mut()
            .find(|f| f.width == width && f.height == height)
        {
            Some(existing) => {
                existing.tiers.extend(d.resolution_tiers());
                existing.tiers = normalize_tiers(std::mem::take(&mut existing.tiers));
                existing.mirrors |= d.can_flip;
            }
            None => footprints.push(Footprint {
                width,
                height,
                tiers: d.resolution_tiers(),
                mirrors: d.can_flip,
            }),
        }
    }
    footprints.sort_by(|a, b| b.width.cmp(&a.width).then(b.height.cmp(&a.height)));
    footprints
}

fn resolve_group(
    footprint: &Footprint,
    sorted: &[CatalogImage],
    warnings: &mut Vec<UpscaleWarning>,
) -> BreakpointGroup {
    let entries = footprint
        .tiers
        .iter()
        .filter_map(|&dppx| {
            let w = footprint.width as f64 * dppx;
            let h = footprint.height as f64 * dppx;
            let image = select_image(sorted, w, h)?;
            if !image.covers(w, h) {
                let warning = UpscaleWarning {
                    device_width: footprint.width,
                    device_height: footprint.height,
                    dppx,
                    required_width: w,
                    required_height: h,
                    chosen: image,
                };
                log::warn!("upscaling risk: {warning}");
                warnings.push(warning);
            }
            Some(BreakpointEntry {
                device_width: footprint.width,
                device_height: footprint.height,
                dppx,
                image,
            })
        })
        .collect();
    BreakpointGroup {
        width: footprint.width,
        height: footprint.height,
        entries,
    }
}

impl Catalog {
    /// Resolve `devices` against `initial` images.
    pub fn build(devices: &[Device], initial: Vec<CatalogImage>) -> Self {
        let mut images = normalize_catalog(initial);
        let mut warnings = Vec::new();

        // Pass 1: landscape breakpoints, collecting mirrored sizes.
        let mut landscape = Vec::new();
        let mut mirrored: Vec<CatalogImage> = Vec::new();
        for fp in collect_footprints(devices, false) {
            let group = resolve_group(&fp, &images, &mut warnings);
            if fp.mirrors {
                for m in group.entries.iter().map(|e| e.image.transposed()) {
                    if !images.contains(&m) && !mirrored.contains(&m) {
                        log::debug!("mirroring {} for {}x{}", m, fp.width, fp.height);
                        mirrored.push(m);
                    }
                }
            }
            landscape.push(group);
        }

        // Pass 2: grow the catalog, then resolve portrait breakpoints.
        if !mirrored.is_empty() {
            images.extend(mirrored);
            images = normalize_catalog(images);
        }
        let portrait = collect_footprints(devices, true)
            .iter()
            .map(|fp| resolve_group(fp, &images, &mut warnings))
            .collect();

        Self {
            images,
            table: QueryTable {
                landscape,
                portrait,
            },
            warnings,
        }
    }

    /// Resolve devices against the catalog derived from the devices themselves.
    pub fn from_devices(devices: &[Device]) -> Self {
        Self::build(devices, derive_catalog(devices))
    }

    /// Final image set, width-descending then height-descending, no duplicates.
    pub fn images(&self) -> &[CatalogImage] {
        &self.images
    }

    pub fn table(&self) -> &QueryTable {
        &self.table
    }

    pub fn warnings(&self) -> &[UpscaleWarning] {
        &self.warnings
    }
}

/// The device table the catalog ships with by default.
pub fn default_devices() -> Vec<Device> {
    vec![
        Device::new(2560, 1600, &[1.0], false),
        Device::new(1920, 1200, &[1.0], false),
        Device::new(1680, 1050, &[1.0], false),
        Device::new(1440, 900, &[2.0, 1.0], false),
        Device::new(1366, 1024, &[2.0, 1.0], true),
        Device::new(1280, 800, &[2.0, 1.5, 1.0], true),
        Device::new(1024, 768, &[2.0, 1.0], true),
        Device::new(960, 600, &[3.0, 2.0], true),
        Device::new(800, 600, &[1.0], false),
        Device::new(768, 432, &[4.0, 3.0, 2.5], true),
        Device::new(690, 412, &[3.5, 2.0], true),
        Device::new(640, 360, &[4.0, 3.0, 2.0, 1.5], true),
        Device::new(480, 320, &[3.0, 2.4, 2.0, 1.5, 1.0], true),
    ]
}
