//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{Anchor, Gravity};

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `target` - Target area dimensions (width, height)
///
/// # Returns
/// * `(width, height)` - Fill dimensions (at least one matches target)
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h)
    }
}

/// Calculate output dimensions when only one edge is constrained.
///
/// Returns `None` when neither edge is given.
pub fn calculate_scaled_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    match (width, height) {
        (Some(w), Some(h)) => Some(calculate_fill_dimensions(source, (w, h))),
        (Some(w), None) => {
            let h = (src_h as f64 * w as f64 / src_w as f64).round() as u32;
            Some((w, h.max(1)))
        }
        (None, Some(h)) => {
            let w = (src_w as f64 * h as f64 / src_h as f64).round() as u32;
            Some((w.max(1), h))
        }
        (None, None) => None,
    }
}

/// Top-left corner of a `target`-sized crop taken out of a `filled` image.
///
/// `filled` must cover `target` in both dimensions (see
/// [`calculate_fill_dimensions`]); the overflow is distributed by `gravity`.
pub fn calculate_crop_offset(filled: (u32, u32), target: (u32, u32), gravity: Gravity) -> (u32, u32) {
    let spare_x = filled.0.saturating_sub(target.0);
    let spare_y = filled.1.saturating_sub(target.1);
    let (ax, ay) = gravity.anchors();
    (offset_along(spare_x, ax), offset_along(spare_y, ay))
}

fn offset_along(spare: u32, anchor: Anchor) -> u32 {
    match anchor {
        Anchor::Start => 0,
        Anchor::Middle => spare / 2,
        Anchor::End => spare,
    }
}
