//! HTML rendering with [maud](https://maud.lambda.xyz/).
//!
//! Small building blocks a host page can drop in ([`render_img`],
//! [`render_style`]) plus the preview page the `build` command writes next
//! to `responsive.json`.

use crate::planner::BackgroundRules;
use crate::site::BuildManifest;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const PREVIEW_CSS: &str = include_str!("../static/preview.css");

/// `<img>` with a srcset. `sizes` defaults to the full viewport width.
pub fn render_img(src: &str, srcset: &str, sizes: Option<&str>, alt: &str) -> Markup {
    html! {
        img src=(src) srcset=(srcset) sizes=(sizes.unwrap_or("100vw")) alt=(alt) loading="lazy";
    }
}

/// `<style>` block holding background rules.
///
/// CSS is emitted unescaped: quotes inside `url("...")` must survive.
pub fn render_style(rules: &BackgroundRules) -> Markup {
    html! {
        style { (PreEscaped(rules.css())) }
    }
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(PREVIEW_CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Preview page: every planned image rendered through its srcset.
pub fn render_preview(manifest: &BuildManifest) -> Markup {
    let content = html! {
        header {
            h1 { "Responsive images (" (manifest.images.len()) ")" }
        }
        main class="images" {
            @for entry in &manifest.images {
                figure {
                    (render_img(&entry.src, &entry.srcset, None, &entry.src))
                    figcaption {
                        code { (entry.src) }
                        " "
                        span class="meta" {
                            (entry.width) "×" (entry.height)
                            @if !entry.variants.is_empty() {
                                ", " (entry.variants.len()) " variants"
                            }
                        }
                    }
                }
            }
        }
        @if !manifest.unreadable.is_empty() {
            section class="unreadable" {
                h2 { "Not images" }
                ul {
                    @for src in &manifest.unreadable {
                        li { code { (src) } }
                    }
                }
            }
        }
    };
    base_document("respimg preview", content)
}
