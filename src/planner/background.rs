//! CSS background rules per breakpoint, orientation and resolution tier.
//!
//! For every breakpoint group of the query table the planner emits one rule
//! per run of resolution tiers that resolve to the same image:
//!
//! ```text
//! .hero { background-size: cover; background-position: center center; background-repeat: no-repeat; }
//! @media (min-width: 1367px), (min-height: 1025px) {
//!   .hero { background-image: url("img/hero-1680x1050.jpg"); }
//! }
//! @media (max-width: 1366px) and (max-height: 1024px) and (orientation: landscape) {
//!   .hero { background-image: url("img/hero-1366x1024.jpg"); }
//! }
//! ```
//!
//! ## Conditions per group
//!
//! - Every group except the widest is capped with `max-width` and
//!   `max-height` at its own footprint.
//! - The next narrower group sets the lower boundary as an OR-group of
//!   `min-width` / `min-height`, one pixel above it, for each dimension in
//!   which it is strictly smaller.
//! - An `orientation` qualifier is added only when both orientations are
//!   emitted and the opposite orientation's breakpoints could match the same
//!   viewport. A group whose lower boundary already reaches the opposite
//!   envelope (its widest width or tallest height) cannot collide and goes
//!   unqualified.
//!
//! ## Resolution tiers
//!
//! A group's entries (descending dppx) are resolved to output URIs and
//! consecutive tiers with the same URI are merged into runs. Run `j` is
//! bounded above by its own highest dppx (except the first run) and below by
//! the next run's highest dppx (except the last run). Both bounds are
//! inclusive, so a display exactly on a boundary matches two rules; the
//! lower run is emitted later and wins the cascade.
//!
//! ## Missing breakpoints
//!
//! Without `crop` only the image's own orientation is emitted. When that
//! orientation has no breakpoints (a portrait image against a table without
//! rotating devices) the other orientation's breakpoints are used instead,
//! and with no breakpoints at all the source is served unconditionally.
//!
//! ## Size semantics
//!
//! Which catalog images are worth serving depends on `background-size`:
//!
//! | Size | Keep image when | Output |
//! |---|---|---|
//! | `cover`, two explicit values | narrower **and** shorter than the source | `-{w}x{h}` |
//! | `contain`, `auto auto` | narrower **or** shorter than the source | `-{w}x{h}` |
//! | `P% auto`, `<length> auto` | width ≤ P% (100% for lengths) of the source width | `-{w}w` |
//! | `auto P%`, `auto <length>` | symmetric on height | `-{h}h` |
//!
//! A rejected tier falls back to the original source URI.

use super::media;
use super::{PlanError, QueryPlanner, SourceImage, TaskList};
use crate::catalog::{BreakpointGroup, CatalogImage, Orientation};
use crate::imaging::{Anchor, Gravity, ResizeTask};
use crate::naming::output_uri;
use cssparser::{Parser, ParserInput, Token};
use std::fmt;
use std::str::FromStr;

/// One axis of an explicit `background-size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeDim {
    Auto,
    Percent(f64),
    /// Absolute length, converted to CSS pixels.
    Px(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BackgroundSize {
    #[default]
    Cover,
    Contain,
    Explicit { width: SizeDim, height: SizeDim },
}

/// CSS pixels per unit for absolute lengths.
fn px_per_unit(unit: &str) -> Option<f64> {
    match unit {
        "px" => Some(1.0),
        "in" => Some(96.0),
        "cm" => Some(96.0 / 2.54),
        "mm" => Some(96.0 / 25.4),
        "pt" => Some(96.0 / 72.0),
        "pc" => Some(16.0),
        _ => None,
    }
}

/// One whitespace-separated component of a size or position value.
#[derive(Debug, Clone, PartialEq)]
enum Component {
    /// Lowercased keyword.
    Ident(String),
    Percent(f64),
    /// Absolute length in CSS pixels. Unitless zero lands here too.
    Px(f64),
}

/// Prefer the exact integer cssparser keeps alongside the float.
fn token_value(value: f32, int_value: Option<i32>) -> f64 {
    int_value.map_or(f64::from(value), f64::from)
}

/// Tokenize a property value into components. `None` when any token is not
/// a keyword, percentage, absolute length or unitless zero.
fn components(value: &str) -> Option<Vec<Component>> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut out = Vec::new();
    while !parser.is_exhausted() {
        let component = match parser.next().ok()? {
            Token::Ident(name) => Component::Ident(name.to_ascii_lowercase()),
            Token::Percentage {
                unit_value,
                int_value,
                ..
            } => Component::Percent(match int_value {
                Some(i) => f64::from(*i),
                None => f64::from(*unit_value) * 100.0,
            }),
            Token::Dimension {
                value,
                int_value,
                unit,
                ..
            } => {
                let scale = px_per_unit(&unit.to_ascii_lowercase())?;
                Component::Px(token_value(*value, *int_value) * scale)
            }
            Token::Number { value, .. } if *value == 0.0 => Component::Px(0.0),
            _ => return None,
        };
        out.push(component);
    }
    Some(out)
}

/// `background-size` components never go negative.
fn size_dim(component: &Component) -> Option<SizeDim> {
    match component {
        Component::Ident(name) if name == "auto" => Some(SizeDim::Auto),
        Component::Percent(p) if *p >= 0.0 => Some(SizeDim::Percent(*p)),
        Component::Px(px) if *px >= 0.0 => Some(SizeDim::Px(*px)),
        _ => None,
    }
}

impl FromStr for BackgroundSize {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PlanError::MalformedSizeSpec(s.to_string());
        let parts = components(s).ok_or_else(malformed)?;
        match parts.as_slice() {
            [Component::Ident(name)] if name == "cover" => Ok(BackgroundSize::Cover),
            [Component::Ident(name)] if name == "contain" => Ok(BackgroundSize::Contain),
            [w] => Ok(BackgroundSize::Explicit {
                width: size_dim(w).ok_or_else(malformed)?,
                height: SizeDim::Auto,
            }),
            [w, h] => Ok(BackgroundSize::Explicit {
                width: size_dim(w).ok_or_else(malformed)?,
                height: size_dim(h).ok_or_else(malformed)?,
            }),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for SizeDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeDim::Auto => f.write_str("auto"),
            SizeDim::Percent(p) => write!(f, "{}%", media::format_number(*p)),
            SizeDim::Px(px) => write!(f, "{}px", media::format_number(*px)),
        }
    }
}

impl fmt::Display for BackgroundSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackgroundSize::Cover => f.write_str("cover"),
            BackgroundSize::Contain => f.write_str("contain"),
            BackgroundSize::Explicit { width, height } => write!(f, "{width} {height}"),
        }
    }
}

/// One axis of `background-position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Offset {
    Keyword(Anchor),
    Percent(f64),
    Px(f64),
}

impl Offset {
    /// Nearest crop anchor. Pixel offsets are measured from the start edge.
    fn anchor(self) -> Anchor {
        match self {
            Offset::Keyword(a) => a,
            Offset::Percent(p) if p <= 25.0 => Anchor::Start,
            Offset::Percent(p) if p >= 75.0 => Anchor::End,
            Offset::Percent(_) => Anchor::Middle,
            Offset::Px(_) => Anchor::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundPosition {
    pub x: Offset,
    pub y: Offset,
}

impl Default for BackgroundPosition {
    fn default() -> Self {
        Self {
            x: Offset::Keyword(Anchor::Middle),
            y: Offset::Keyword(Anchor::Middle),
        }
    }
}

impl BackgroundPosition {
    pub fn gravity(&self) -> Gravity {
        Gravity::from_anchors(self.x.anchor(), self.y.anchor())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
    Either,
}

fn parse_offset(component: &Component) -> Option<(Offset, Axis)> {
    let keyword = |anchor, axis| Some((Offset::Keyword(anchor), axis));
    match component {
        Component::Ident(name) => match name.as_str() {
            "left" => keyword(Anchor::Start, Axis::Horizontal),
            "right" => keyword(Anchor::End, Axis::Horizontal),
            "top" => keyword(Anchor::Start, Axis::Vertical),
            "bottom" => keyword(Anchor::End, Axis::Vertical),
            "center" => keyword(Anchor::Middle, Axis::Either),
            _ => None,
        },
        Component::Percent(p) => Some((Offset::Percent(*p), Axis::Either)),
        Component::Px(px) => Some((Offset::Px(*px), Axis::Either)),
    }
}

impl FromStr for BackgroundPosition {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PlanError::MalformedPosition(s.to_string());
        let parts = components(s).ok_or_else(malformed)?;
        let center = (Offset::Keyword(Anchor::Middle), Axis::Either);

        let (first, second) = match parts.as_slice() {
            [one] => {
                let parsed = parse_offset(one).ok_or_else(malformed)?;
                if parsed.1 == Axis::Vertical {
                    (center, parsed)
                } else {
                    (parsed, center)
                }
            }
            [a, b] => (
                parse_offset(a).ok_or_else(malformed)?,
                parse_offset(b).ok_or_else(malformed)?,
            ),
            _ => return Err(malformed()),
        };

        // "top left" is written vertical-first.
        let ((x, x_axis), (y, y_axis)) =
            if first.1 == Axis::Vertical || second.1 == Axis::Horizontal {
                (second, first)
            } else {
                (first, second)
            };
        if x_axis == Axis::Vertical || y_axis == Axis::Horizontal {
            return Err(malformed());
        }
        Ok(Self { x, y })
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Keyword(_) => Ok(()),
            Offset::Percent(p) => write!(f, "{}%", media::format_number(*p)),
            Offset::Px(px) => write!(f, "{}px", media::format_number(*px)),
        }
    }
}

impl fmt::Display for BackgroundPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.x {
            Offset::Keyword(Anchor::Start) => f.write_str("left")?,
            Offset::Keyword(Anchor::Middle) => f.write_str("center")?,
            Offset::Keyword(Anchor::End) => f.write_str("right")?,
            other => write!(f, "{other}")?,
        }
        f.write_str(" ")?;
        match self.y {
            Offset::Keyword(Anchor::Start) => f.write_str("top"),
            Offset::Keyword(Anchor::Middle) => f.write_str("center"),
            Offset::Keyword(Anchor::End) => f.write_str("bottom"),
            other => write!(f, "{other}"),
        }
    }
}

/// Options of one background request.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackgroundOptions {
    pub position: BackgroundPosition,
    pub size: BackgroundSize,
    /// Crop outputs to their exact box and emit both orientations.
    pub crop: bool,
}

/// One `@media` rule. No queries means the image applies unconditionally.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRule {
    pub queries: Vec<String>,
    pub uri: String,
}

/// CSS for one selector plus the resizes it depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundRules {
    pub selector: String,
    pub options: BackgroundOptions,
    pub rules: Vec<MediaRule>,
    pub tasks: Vec<ResizeTask>,
}

impl BackgroundRules {
    /// A single unconditional rule pointing at `uri`.
    pub fn fallback(selector: &str, uri: &str, options: BackgroundOptions) -> Self {
        Self {
            selector: selector.to_string(),
            options,
            rules: vec![MediaRule {
                queries: Vec::new(),
                uri: uri.to_string(),
            }],
            tasks: Vec::new(),
        }
    }

    pub fn css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BackgroundRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sel = &self.selector;
        writeln!(
            f,
            "{sel} {{ background-size: {}; background-position: {}; background-repeat: no-repeat; }}",
            self.options.size, self.options.position
        )?;
        for rule in &self.rules {
            let decl = format!("{sel} {{ background-image: url(\"{}\"); }}", rule.uri);
            if rule.queries.is_empty() {
                writeln!(f, "{decl}")?;
            } else {
                writeln!(f, "@media {} {{", rule.queries.join(", "))?;
                writeln!(f, "  {decl}")?;
                writeln!(f, "}}")?;
            }
        }
        Ok(())
    }
}

/// Which edges a kept image is resized to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Box,
    Width,
    Height,
}

/// Which catalog images a `background-size` can use for a given source.
struct SizeFilter {
    keep: Box<dyn Fn(CatalogImage) -> bool>,
    target: Target,
}

impl SizeFilter {
    fn new(size: BackgroundSize, image: &SourceImage) -> Self {
        let (src_w, src_h) = (image.width as f64, image.height as f64);
        let both = move |img: CatalogImage| img.width as f64 <= src_w && img.height as f64 <= src_h;
        let either =
            move |img: CatalogImage| img.width as f64 <= src_w || img.height as f64 <= src_h;

        let (keep, target): (Box<dyn Fn(CatalogImage) -> bool>, Target) = match size {
            BackgroundSize::Cover => (Box::new(both), Target::Box),
            BackgroundSize::Contain
            | BackgroundSize::Explicit {
                width: SizeDim::Auto,
                height: SizeDim::Auto,
            } => (Box::new(either), Target::Box),
            BackgroundSize::Explicit {
                width,
                height: SizeDim::Auto,
            } => {
                let limit = src_w * fraction(width);
                (
                    Box::new(move |img: CatalogImage| img.width as f64 <= limit),
                    Target::Width,
                )
            }
            BackgroundSize::Explicit {
                width: SizeDim::Auto,
                height,
            } => {
                let limit = src_h * fraction(height);
                (
                    Box::new(move |img: CatalogImage| img.height as f64 <= limit),
                    Target::Height,
                )
            }
            BackgroundSize::Explicit { .. } => (Box::new(both), Target::Box),
        };
        Self { keep, target }
    }
}

/// Share of the source a single-axis size can use.
fn fraction(dim: SizeDim) -> f64 {
    match dim {
        SizeDim::Percent(p) => p / 100.0,
        SizeDim::Px(_) | SizeDim::Auto => 1.0,
    }
}

/// Widest width and tallest height across groups.
fn envelope(groups: &[BreakpointGroup]) -> Option<(u32, u32)> {
    groups.iter().fold(None, |acc, g| match acc {
        None => Some((g.width, g.height)),
        Some((w, h)) => Some((w.max(g.width), h.max(g.height))),
    })
}

impl QueryPlanner {
    /// Background rules for `selector` showing `image`.
    pub fn build_background_rules(
        &self,
        selector: &str,
        image: &SourceImage,
        options: &BackgroundOptions,
    ) -> BackgroundRules {
        let table = self.catalog.table();
        let orientations = if options.crop {
            vec![Orientation::Landscape, Orientation::Portrait]
        } else {
            let own = image.orientation();
            if table.groups(own).is_empty() {
                log::debug!(
                    "no {} breakpoints for {}, using {}",
                    own.as_str(),
                    image.src,
                    own.opposite().as_str()
                );
                vec![own.opposite()]
            } else {
                vec![own]
            }
        };
        let filter = SizeFilter::new(options.size, image);
        let gravity = options.position.gravity();

        let mut tasks = TaskList::default();
        let mut rules = Vec::new();

        for &orientation in &orientations {
            let groups = table.groups(orientation);
            let opposite = if orientations.len() > 1 {
                envelope(table.groups(orientation.opposite()))
            } else {
                None
            };

            for (i, group) in groups.iter().enumerate() {
                let next = groups.get(i + 1);

                let mut prefix = Vec::new();
                if i > 0 {
                    prefix.push(media::max_width(group.width));
                    prefix.push(media::max_height(group.height));
                }
                let collides = match (opposite, next) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some((opp_w, opp_h)), Some(n)) => n.width < opp_w && n.height < opp_h,
                };
                if collides {
                    prefix.push(media::orientation(orientation.as_str()));
                }

                let mut bounds = Vec::new();
                if let Some(n) = next {
                    if n.width < group.width {
                        bounds.push(media::min_width(n.width + 1));
                    }
                    if n.height < group.height {
                        bounds.push(media::min_height(n.height + 1));
                    }
                }

                // (highest dppx, uri) per run of identical outputs.
                let mut runs: Vec<(f64, String)> = Vec::new();
                for entry in &group.entries {
                    let uri = self.resolve_tier(
                        image,
                        entry.image,
                        &filter,
                        gravity,
                        options.crop,
                        &mut tasks,
                    );
                    if runs.last().is_none_or(|(_, last)| *last != uri) {
                        runs.push((entry.dppx, uri));
                    }
                }

                let last_run = runs.len().saturating_sub(1);
                for (j, (dppx, uri)) in runs.iter().enumerate() {
                    let mut or_groups = vec![bounds.clone()];
                    if j > 0 {
                        or_groups.push(media::max_resolution(*dppx));
                    }
                    if j < last_run {
                        or_groups.push(media::min_resolution(runs[j + 1].0));
                    }
                    rules.push(MediaRule {
                        queries: media::permute(&prefix, &or_groups),
                        uri: uri.clone(),
                    });
                }
            }
        }

        if rules.is_empty() {
            log::warn!(
                "no breakpoints to place {} under, serving it unconditionally",
                image.src
            );
            return BackgroundRules::fallback(selector, &image.src, *options);
        }

        BackgroundRules {
            selector: selector.to_string(),
            options: *options,
            rules,
            tasks: tasks.into_vec(),
        }
    }

    /// URI serving one resolution tier, queuing its resize if the size
    /// filter keeps the image; the source itself otherwise.
    fn resolve_tier(
        &self,
        image: &SourceImage,
        chosen: CatalogImage,
        filter: &SizeFilter,
        gravity: Gravity,
        crop: bool,
        tasks: &mut TaskList,
    ) -> String {
        if !(filter.keep)(chosen) {
            return image.src.clone();
        }
        let (width, height) = match filter.target {
            Target::Box => (Some(chosen.width), Some(chosen.height)),
            Target::Width => (Some(chosen.width), None),
            Target::Height => (None, Some(chosen.height)),
        };
        let uri = output_uri(&image.src, width, height);
        tasks.push(ResizeTask {
            source: image.path.clone(),
            output: self.dirs.output_path(&uri),
            width,
            height,
            gravity,
            crop: crop && filter.target == Target::Box,
            quality: self.quality,
        });
        uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Device};
    use crate::imaging::{Dimensions, Quality};
    use crate::naming::BuildDirs;
    use tempfile::TempDir;

    fn planner(tmp: &TempDir, catalog: Catalog) -> QueryPlanner {
        QueryPlanner::new(
            catalog,
            BuildDirs::new(tmp.path().join("src"), tmp.path().join("out")),
            Quality::default(),
        )
    }

    fn source(tmp: &TempDir, w: u32, h: u32) -> SourceImage {
        SourceImage::new("img/a.jpg", tmp.path().join("src/img/a.jpg"), Dimensions::new(w, h))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Size parsing
    // =========================================================================

    #[test]
    fn parse_size_keywords() {
        assert_eq!("cover".parse(), Ok(BackgroundSize::Cover));
        assert_eq!(" Contain ".parse(), Ok(BackgroundSize::Contain));
    }

    #[test]
    fn parse_size_single_value_implies_auto_height() {
        assert_eq!(
            "50%".parse(),
            Ok(BackgroundSize::Explicit {
                width: SizeDim::Percent(50.0),
                height: SizeDim::Auto,
            })
        );
    }

    #[test]
    fn parse_size_absolute_lengths_convert_to_px() {
        assert_eq!(
            "1in auto".parse(),
            Ok(BackgroundSize::Explicit {
                width: SizeDim::Px(96.0),
                height: SizeDim::Auto,
            })
        );
        assert_eq!(
            "auto 3pc".parse(),
            Ok(BackgroundSize::Explicit {
                width: SizeDim::Auto,
                height: SizeDim::Px(48.0),
            })
        );
        assert_eq!(
            "2pc 300px".parse(),
            Ok(BackgroundSize::Explicit {
                width: SizeDim::Px(32.0),
                height: SizeDim::Px(300.0),
            })
        );
    }

    #[test]
    fn parse_size_rejects_garbage() {
        for bad in ["", "banana", "50", "10vw", "-5%", "1px 2px 3px", "cover contain"] {
            assert_eq!(
                bad.parse::<BackgroundSize>(),
                Err(PlanError::MalformedSizeSpec(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn parse_size_accepts_unitless_zero() {
        assert_eq!(
            "0 auto".parse(),
            Ok(BackgroundSize::Explicit {
                width: SizeDim::Px(0.0),
                height: SizeDim::Auto,
            })
        );
        assert_eq!(
            "12.5px 0".parse(),
            Ok(BackgroundSize::Explicit {
                width: SizeDim::Px(12.5),
                height: SizeDim::Px(0.0),
            })
        );
    }

    #[test]
    fn size_display_round_trips_css() {
        let size: BackgroundSize = "50% auto".parse().unwrap();
        assert_eq!(size.to_string(), "50% auto");
        assert_eq!(BackgroundSize::Cover.to_string(), "cover");
    }

    // =========================================================================
    // Position parsing
    // =========================================================================

    #[test]
    fn parse_position_keywords_to_gravity() {
        let pos: BackgroundPosition = "left top".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::NorthWest);
        let pos: BackgroundPosition = "top left".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::NorthWest);
        let pos: BackgroundPosition = "center bottom".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::South);
        let pos: BackgroundPosition = "right".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::East);
        let pos: BackgroundPosition = "top".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::North);
    }

    #[test]
    fn parse_position_percentages() {
        let pos: BackgroundPosition = "100% 0%".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::NorthEast);
        let pos: BackgroundPosition = "50% 50%".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::Center);
        assert_eq!(pos.to_string(), "50% 50%");
    }

    #[test]
    fn parse_position_signed_and_zero_offsets() {
        let pos: BackgroundPosition = "-10px 0".parse().unwrap();
        assert_eq!(pos.x, Offset::Px(-10.0));
        assert_eq!(pos.y, Offset::Px(0.0));
        assert_eq!(pos.gravity(), Gravity::NorthWest);
        assert_eq!(pos.to_string(), "-10px 0px");

        let pos: BackgroundPosition = "0 50%".parse().unwrap();
        assert_eq!(pos.gravity(), Gravity::West);

        let pos: BackgroundPosition = "right -5%".parse().unwrap();
        assert_eq!(pos.y, Offset::Percent(-5.0));
        assert_eq!(pos.gravity(), Gravity::NorthEast);
    }

    #[test]
    fn parse_position_rejects_garbage() {
        for bad in ["", "middle", "left right", "top bottom", "1em", "a b c", "5", "1px, 2px"] {
            assert_eq!(
                bad.parse::<BackgroundPosition>(),
                Err(PlanError::MalformedPosition(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn default_position_displays_as_center() {
        assert_eq!(BackgroundPosition::default().to_string(), "center center");
    }

    // =========================================================================
    // Rules
    // =========================================================================

    #[test]
    fn orientation_clause_only_where_envelopes_overlap() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![
            Device::new(1680, 1050, &[1.0], false),
            Device::new(1366, 1024, &[1.0], true),
        ];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            crop: true,
            ..Default::default()
        };

        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 3000), &options);

        let queries: Vec<Vec<String>> = rules.rules.iter().map(|r| r.queries.clone()).collect();
        assert_eq!(
            queries,
            vec![
                strings(&["(min-width: 1367px)", "(min-height: 1025px)"]),
                strings(&["(max-width: 1366px) and (max-height: 1024px) and (orientation: landscape)"]),
                strings(&["(orientation: portrait)"]),
            ]
        );
        assert_eq!(rules.rules[0].uri, "img/a-1680x1050.jpg");
        assert_eq!(rules.rules[1].uri, "img/a-1366x1024.jpg");
        assert_eq!(rules.rules[2].uri, "img/a-1024x1366.jpg");
        assert!(rules.tasks.iter().all(|t| t.crop));
    }

    #[test]
    fn without_crop_only_image_orientation_is_emitted() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1366, 1024, &[1.0], true)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));

        let rules = planner.build_background_rules(
            ".hero",
            &source(&tmp, 2000, 3000),
            &BackgroundOptions::default(),
        );

        assert_eq!(rules.rules.len(), 1);
        assert!(rules.rules[0].queries.is_empty());
        assert_eq!(rules.rules[0].uri, "img/a-1024x1366.jpg");
        assert!(!rules.css().contains("orientation"));
        assert!(!rules.tasks[0].crop);
    }

    #[test]
    fn portrait_image_without_rotating_devices_uses_landscape_breakpoints() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));

        let rules = planner.build_background_rules(
            ".hero",
            &source(&tmp, 2000, 3000),
            &BackgroundOptions::default(),
        );

        assert_eq!(
            rules.rules,
            vec![MediaRule {
                queries: vec![],
                uri: "img/a-1280x800.jpg".into(),
            }]
        );
        assert!(rules.css().contains("background-image: url(\"img/a-1280x800.jpg\")"));
        assert_eq!(rules.tasks.len(), 1);
    }

    #[test]
    fn empty_table_serves_source_unconditionally() {
        let tmp = TempDir::new().unwrap();
        let planner = planner(&tmp, Catalog::build(&[], Vec::new()));

        let rules = planner.build_background_rules(
            ".hero",
            &source(&tmp, 2000, 3000),
            &BackgroundOptions::default(),
        );

        assert_eq!(
            rules,
            BackgroundRules::fallback(".hero", "img/a.jpg", BackgroundOptions::default())
        );
    }

    #[test]
    fn resolution_tiers_merge_and_bound() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[2.0, 1.5], false)];
        let catalog = Catalog::build(
            &devices,
            vec![CatalogImage::new(2560, 1600), CatalogImage::new(1920, 1200)],
        );
        let planner = planner(&tmp, catalog);

        let rules = planner.build_background_rules(
            ".hero",
            &source(&tmp, 3000, 2000),
            &BackgroundOptions::default(),
        );

        assert_eq!(
            rules.rules,
            vec![
                MediaRule {
                    queries: strings(&[
                        "(-webkit-min-device-pixel-ratio: 1.5)",
                        "(min-resolution: 144dpi)",
                    ]),
                    uri: "img/a-2560x1600.jpg".into(),
                },
                MediaRule {
                    queries: strings(&[
                        "(-webkit-max-device-pixel-ratio: 1.5)",
                        "(max-resolution: 144dpi)",
                    ]),
                    uri: "img/a-1920x1200.jpg".into(),
                },
            ]
        );
        assert_eq!(rules.tasks.len(), 2);
    }

    #[test]
    fn lower_bounds_permute_with_resolution_bounds() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![
            Device::new(1920, 1200, &[2.0], false),
            Device::new(1280, 800, &[1.0], false),
        ];
        let catalog = Catalog::build(
            &devices,
            vec![
                CatalogImage::new(3840, 2400),
                CatalogImage::new(1920, 1200),
                CatalogImage::new(1280, 800),
            ],
        );
        let planner = planner(&tmp, catalog);

        let rules = planner.build_background_rules(
            ".hero",
            &source(&tmp, 4000, 3000),
            &BackgroundOptions::default(),
        );

        assert_eq!(
            rules.rules[0].queries,
            strings(&[
                "(min-width: 1281px) and (-webkit-min-device-pixel-ratio: 1)",
                "(min-width: 1281px) and (min-resolution: 96dpi)",
                "(min-height: 801px) and (-webkit-min-device-pixel-ratio: 1)",
                "(min-height: 801px) and (min-resolution: 96dpi)",
            ])
        );
        assert_eq!(rules.rules[0].uri, "img/a-3840x2400.jpg");
    }

    #[test]
    fn rejected_tiers_fall_back_to_source() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[2.0, 1.5], false)];
        let catalog = Catalog::build(
            &devices,
            vec![CatalogImage::new(2560, 1600), CatalogImage::new(1920, 1200)],
        );
        let planner = planner(&tmp, catalog);

        let rules = planner.build_background_rules(
            ".hero",
            &source(&tmp, 1000, 700),
            &BackgroundOptions::default(),
        );

        assert_eq!(
            rules.rules,
            vec![MediaRule {
                queries: vec![],
                uri: "img/a.jpg".into(),
            }]
        );
        assert!(rules.tasks.is_empty());
    }

    #[test]
    fn width_only_size_targets_width() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            size: "50%".parse().unwrap(),
            ..Default::default()
        };

        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 500), &options);

        assert_eq!(rules.rules[0].uri, "img/a-1280w.jpg");
        assert_eq!(rules.tasks[0].width, Some(1280));
        assert_eq!(rules.tasks[0].height, None);
    }

    #[test]
    fn width_only_size_rejects_images_wider_than_share() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            size: "25%".parse().unwrap(),
            ..Default::default()
        };

        // 25% of 3000 is 750, narrower than the 1280 catalog image.
        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 500), &options);

        assert_eq!(rules.rules[0].uri, "img/a.jpg");
        assert!(rules.tasks.is_empty());
    }

    #[test]
    fn height_only_size_targets_height() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            size: "auto 50%".parse().unwrap(),
            crop: true,
            ..Default::default()
        };

        let rules = planner.build_background_rules(".hero", &source(&tmp, 500, 3000), &options);

        assert_eq!(rules.rules[0].uri, "img/a-800h.jpg");
        assert_eq!(rules.tasks[0].width, None);
        assert_eq!(rules.tasks[0].height, Some(800));
        assert!(!rules.tasks[0].crop);
    }

    #[test]
    fn two_explicit_values_filter_like_cover() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            size: "300px 200px".parse().unwrap(),
            ..Default::default()
        };

        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 2000), &options);
        assert_eq!(rules.rules[0].uri, "img/a-1280x800.jpg");
        assert_eq!(
            (rules.tasks[0].width, rules.tasks[0].height),
            (Some(1280), Some(800))
        );

        // Too short for the box: cover rejects what contain would keep.
        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 500), &options);
        assert_eq!(rules.rules[0].uri, "img/a.jpg");
        assert!(rules.tasks.is_empty());
    }

    #[test]
    fn contain_keeps_image_when_either_edge_fits() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            size: BackgroundSize::Contain,
            ..Default::default()
        };

        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 500), &options);

        assert_eq!(rules.rules[0].uri, "img/a-1280x800.jpg");
    }

    #[test]
    fn gravity_follows_position() {
        let tmp = TempDir::new().unwrap();
        let devices = vec![Device::new(1280, 800, &[1.0], false)];
        let planner = planner(&tmp, Catalog::from_devices(&devices));
        let options = BackgroundOptions {
            position: "right bottom".parse().unwrap(),
            crop: true,
            ..Default::default()
        };

        let rules = planner.build_background_rules(".hero", &source(&tmp, 3000, 2000), &options);

        assert_eq!(rules.tasks[0].gravity, Gravity::SouthEast);
    }

    #[test]
    fn css_renders_base_and_media_rules() {
        let rules = BackgroundRules {
            selector: ".hero".into(),
            options: BackgroundOptions::default(),
            rules: vec![
                MediaRule {
                    queries: strings(&["(min-width: 801px)", "(min-height: 601px)"]),
                    uri: "a-1280x800.jpg".into(),
                },
                MediaRule {
                    queries: vec![],
                    uri: "a.jpg".into(),
                },
            ],
            tasks: vec![],
        };
        assert_eq!(
            rules.css(),
            concat!(
                ".hero { background-size: cover; background-position: center center; background-repeat: no-repeat; }\n",
                "@media (min-width: 801px), (min-height: 601px) {\n",
                "  .hero { background-image: url(\"a-1280x800.jpg\"); }\n",
                "}\n",
                ".hero { background-image: url(\"a.jpg\"); }\n",
            )
        );
    }

    #[test]
    fn fallback_is_single_unconditional_rule() {
        let rules = BackgroundRules::fallback(".x", "raw.jpg", BackgroundOptions::default());
        assert!(rules.css().ends_with(".x { background-image: url(\"raw.jpg\"); }\n"));
        assert!(rules.tasks.is_empty());
    }
}
