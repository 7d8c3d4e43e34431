//! Stand-in pictures for chart and image markers.
//!
//! The model cannot draw, so every `[CHART]` or `[IMAGE]` marker becomes a labelled
//! grey card. The card is written as SVG and rasterized with `resvg` so the DOCX embeds
//! a plain PNG that any word processor can show.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::error::ScribeError;

/// Width of an embedded placeholder picture.
pub const PICTURE_WIDTH_INCHES: f32 = 4.0;

/// Height of an embedded placeholder picture (4:3 card).
pub const PICTURE_HEIGHT_INCHES: f32 = 3.0;

const CARD_WIDTH_PX: u32 = 480;
const CARD_HEIGHT_PX: u32 = 360;

static FONTS: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    if fontdb.is_empty() {
        warn!("No system fonts found, placeholder labels will render without text");
    }
    Arc::new(fontdb)
});

/// Label for a chart placeholder, e.g. `bar_chart`.
pub fn chart_label(subtype: &str) -> String {
    format!("{subtype}_chart")
}

/// Label for an image placeholder, e.g. `diagram_image`.
pub fn image_label(subtype: &str) -> String {
    format!("{subtype}_image")
}

/// SVG source of the card for `label`.
pub fn placeholder_svg(label: &str) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
  <rect x="0" y="0" width="{w}" height="{h}" fill="#f2f2f2"/>
  <rect x="8" y="8" width="{iw}" height="{ih}" fill="none" stroke="#646464" stroke-width="4" stroke-dasharray="16 8"/>
  <text x="{cx}" y="{cy}" font-family="Calibri, Carlito, Arial, sans-serif" font-size="32" fill="#646464" text-anchor="middle">{label}</text>
</svg>"##,
        w = CARD_WIDTH_PX,
        h = CARD_HEIGHT_PX,
        iw = CARD_WIDTH_PX - 16,
        ih = CARD_HEIGHT_PX - 16,
        cx = CARD_WIDTH_PX / 2,
        cy = CARD_HEIGHT_PX / 2 + 10,
        label = escape_text(label),
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Rasterize the card for `label` to PNG bytes.
pub fn render_placeholder(label: &str) -> Result<Vec<u8>, ScribeError> {
    let svg = placeholder_svg(label);

    let tree = {
        let mut opts = usvg::Options::default();
        opts.fontdb = FONTS.clone();
        usvg::Tree::from_str(&svg, &opts)
            .map_err(|e| ScribeError::Document(format!("SVG parsing failed: {e}")))?
    };

    let mut pixmap = tiny_skia::Pixmap::new(CARD_WIDTH_PX, CARD_HEIGHT_PX).ok_or_else(|| {
        ScribeError::Document(format!(
            "Failed to create pixmap ({}x{})",
            CARD_WIDTH_PX, CARD_HEIGHT_PX
        ))
    })?;

    resvg::render(&tree, tiny_skia::Transform::from_scale(1.0, 1.0), &mut pixmap.as_mut());

    let png = pixmap
        .encode_png()
        .map_err(|e| ScribeError::Document(format!("PNG encoding failed: {e}")))?;
    debug!("Rendered placeholder '{}' ({} bytes)", label, png.len());
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(chart_label("bar"), "bar_chart");
        assert_eq!(image_label("generic"), "generic_image");
    }

    #[test]
    fn test_svg_carries_escaped_label() {
        let svg = placeholder_svg("a<b");
        assert!(svg.contains(">a&lt;b</text>"));
    }

    #[test]
    fn test_render_produces_png() {
        let png = render_placeholder("bar_chart").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
