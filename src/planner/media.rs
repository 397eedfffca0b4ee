//! Media condition synthesis.
//!
//! A media rule is built from an AND-prefix (conditions that must all hold)
//! and a list of OR-groups (pick one alternative from each group). CSS has no
//! nested boolean syntax inside one query, so the groups are expanded into
//! the full cross product, each combination becoming one comma-separated
//! alternative of the final `@media` list.

/// CSS reference pixel density: 1dppx = 96dpi.
const DPI_PER_DPPX: f64 = 96.0;

/// Expand OR-groups into every AND-combination, first group outermost.
///
/// ```
/// use respimg::planner::media::permute;
///
/// let queries = permute(
///     &["x".to_string()],
///     &[
///         vec!["a".to_string(), "b".to_string()],
///         vec!["c".to_string(), "d".to_string()],
///     ],
/// );
/// assert_eq!(queries, ["x and a and c", "x and a and d", "x and b and c", "x and b and d"]);
/// ```
///
/// Empty groups are ignored. No conditions at all yields no queries.
pub fn permute(prefix: &[String], groups: &[Vec<String>]) -> Vec<String> {
    groups
        .iter()
        .filter(|g| !g.is_empty())
        .fold(vec![prefix.to_vec()], |combos, group| {
            combos
                .iter()
                .flat_map(|combo| {
                    group.iter().map(move |alt| {
                        let mut next = combo.clone();
                        next.push(alt.clone());
                        next
                    })
                })
                .collect()
        })
        .into_iter()
        .filter(|combo| !combo.is_empty())
        .map(|combo| combo.join(" and "))
        .collect()
}

/// At most two decimals, trailing zeros trimmed: `2.0` → `2`, `1.5` → `1.5`.
pub fn format_number(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

pub fn max_width(px: u32) -> String {
    format!("(max-width: {px}px)")
}

pub fn max_height(px: u32) -> String {
    format!("(max-height: {px}px)")
}

pub fn min_width(px: u32) -> String {
    format!("(min-width: {px}px)")
}

pub fn min_height(px: u32) -> String {
    format!("(min-height: {px}px)")
}

pub fn orientation(name: &str) -> String {
    format!("(orientation: {name})")
}

/// Upper resolution bound, vendor-prefixed and standard alternatives.
pub fn max_resolution(dppx: f64) -> Vec<String> {
    vec![
        format!("(-webkit-max-device-pixel-ratio: {})", format_number(dppx)),
        format!("(max-resolution: {}dpi)", format_number(dppx * DPI_PER_DPPX)),
    ]
}

/// Lower resolution bound, vendor-prefixed and standard alternatives.
pub fn min_resolution(dppx: f64) -> Vec<String> {
    vec![
        format!("(-webkit-min-device-pixel-ratio: {})", format_number(dppx)),
        format!("(min-resolution: {}dpi)", format_number(dppx * DPI_PER_DPPX)),
    ]
}
