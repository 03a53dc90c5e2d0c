//! Placeholder geometry and element stylization.

use crate::document::{DocumentAdapter, ImageGeometry, ImageId, StyleProperty};

/// Fully transparent PNG used as the placeholder background. Embedded so the
/// background itself can never fail to load.
///
/// The image is 2x2 pixels, not 1x1. Only its transparency matters.
pub const TRANSPARENT_PIXEL_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAIAAAACCAYAAABytg0kAAAAE0lEQVR42mNgAIIzZ878hxBAAAA8bwbHJ1VugQAAAABJRU5ErkJggg==";

/// Separator between width and height in the label (U+00D7).
pub const DIMENSION_SEPARATOR: &str = " \u{00d7} ";

/// Tunables for placeholder rendering.
///
/// `Default` yields the canonical look: 5px legibility floor, font no taller
/// than 75% of the box, glyphs assumed 1/1.5 of the font size wide, and a
/// 4px line-height inset for vertical centering.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaceholderStyle {
    /// Lower bound for the computed font size in px.
    pub min_font_px: f64,
    /// Upper bound for the font size as a fraction of the box height.
    pub max_font_height_ratio: f64,
    /// Font size per glyph-width unit (`font_px = glyph_width * factor`).
    pub glyph_width_factor: f64,
    /// Subtracted from the box height to get the line height.
    pub line_height_inset_px: i64,
    /// Value of the CSS `font-family` property.
    pub font_family: String,
    /// Data URI used as the flat background.
    pub background_uri: String,
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            min_font_px: 5.0,
            max_font_height_ratio: 0.75,
            glyph_width_factor: 1.5,
            line_height_inset_px: 4,
            font_family: "monospace".to_string(),
            background_uri: TRANSPARENT_PIXEL_DATA_URI.to_string(),
        }
    }
}

impl PlaceholderStyle {
    /// Replace the font family.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    /// Replace the minimum font size. Negative and NaN values fall back to 0.
    pub fn with_min_font_px(mut self, min_font_px: f64) -> Self {
        self.min_font_px = if min_font_px.is_nan() {
            0.0
        } else {
            min_font_px.max(0.0)
        };
        self
    }

    /// Font size for a box: `max(min(w / len(label) * factor, h * ratio), floor)`.
    ///
    /// The floor wins over the height ceiling for very short boxes.
    pub fn font_size_px(&self, geometry: ImageGeometry, label: &str) -> f64 {
        let glyphs = label.chars().count().max(1) as f64;
        let fit_width = f64::from(geometry.width) / glyphs * self.glyph_width_factor;
        let ceiling = f64::from(geometry.height) * self.max_font_height_ratio;
        fit_width.min(ceiling).max(self.min_font_px)
    }

    /// Line height for a box. Goes negative for boxes shorter than the inset,
    /// which CSS ignores.
    pub fn line_height_px(&self, geometry: ImageGeometry) -> i64 {
        i64::from(geometry.height) - self.line_height_inset_px
    }
}

/// Fully computed placeholder for one geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Placeholder {
    pub label: String,
    pub font_size_px: f64,
    pub line_height_px: i64,
}

impl Placeholder {
    /// Compute the placeholder for `geometry`.
    pub fn compute(geometry: ImageGeometry, style: &PlaceholderStyle) -> Self {
        let label = dimension_label(geometry);
        let font_size_px = style.font_size_px(geometry, &label);
        Self {
            line_height_px: style.line_height_px(geometry),
            font_size_px,
            label,
        }
    }

    /// Inline style declarations in application order.
    pub fn declarations(&self, style: &PlaceholderStyle) -> [(StyleProperty, String); 5] {
        [
            (
                StyleProperty::BackgroundImage,
                format!("url(\"{}\")", style.background_uri),
            ),
            (StyleProperty::FontFamily, style.font_family.clone()),
            (StyleProperty::FontSize, css_px(self.font_size_px)),
            (
                StyleProperty::LineHeight,
                format!("{}px", self.line_height_px),
            ),
            (StyleProperty::TextAlign, "center".to_string()),
        ]
    }
}

/// `"{w} × {h}"`.
pub fn dimension_label(geometry: ImageGeometry) -> String {
    format!(
        "{}{}{}",
        geometry.width, DIMENSION_SEPARATOR, geometry.height
    )
}

// Shortest round-trip decimal without a trailing ".0", the form a script
// would hand to the style engine.
fn css_px(value: f64) -> String {
    format!("{}px", value)
}

/// Mutate `image` into its placeholder for the given geometry.
///
/// Fallback text is set before the source is cleared; some engines flash the
/// native broken icon otherwise. Every property is overwritten, so calling
/// this again for the same geometry reproduces the same element state.
pub fn stylize<D>(
    doc: &mut D,
    image: ImageId,
    geometry: ImageGeometry,
    style: &PlaceholderStyle,
) -> Placeholder
where
    D: DocumentAdapter + ?Sized,
{
    let placeholder = Placeholder::compute(geometry, style);
    doc.set_fallback_text(image, &placeholder.label);
    doc.clear_source(image);
    for (property, value) in placeholder.declarations(style) {
        doc.set_style(image, property, &value);
    }
    log::trace!(
        "stylized {} as {:?} (font {}px)",
        image,
        placeholder.label,
        placeholder.font_size_px
    );
    placeholder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute(width: u32, height: u32) -> Placeholder {
        Placeholder::compute(ImageGeometry::new(width, height), &PlaceholderStyle::default())
    }

    #[test]
    fn label_uses_multiplication_sign() {
        let label = dimension_label(ImageGeometry::new(200, 100));
        assert_eq!(label, "200 \u{00d7} 100");
        assert_eq!(label.chars().count(), 9);
        assert!(!label.contains('x'));
    }

    #[test]
    fn wide_box_is_limited_by_label_width() {
        let placeholder = compute(200, 100);
        assert!((placeholder.font_size_px - 200.0 / 9.0 * 1.5).abs() < 1e-9);
        assert_eq!(placeholder.line_height_px, 96);
    }

    #[test]
    fn short_box_is_limited_by_height() {
        let placeholder = compute(1000, 20);
        assert_eq!(placeholder.font_size_px, 15.0);
    }

    #[test]
    fn tiny_box_hits_floor() {
        assert_eq!(compute(10, 100).font_size_px, 5.0);
        // Floor wins over the height ceiling.
        assert_eq!(compute(100, 4).font_size_px, 5.0);
    }

    #[test]
    fn zero_geometry_does_not_panic() {
        let placeholder = compute(0, 0);
        assert_eq!(placeholder.label, "0 \u{00d7} 0");
        assert_eq!(placeholder.font_size_px, 5.0);
        assert_eq!(placeholder.line_height_px, -4);
    }

    #[test]
    fn declarations_render_css_values() {
        let style = PlaceholderStyle::default();
        let placeholder = compute(100, 50);
        let decls = placeholder.declarations(&style);
        assert_eq!(decls[1], (StyleProperty::FontFamily, "monospace".to_string()));
        assert_eq!(decls[2], (StyleProperty::FontSize, "18.75px".to_string()));
        assert_eq!(decls[3], (StyleProperty::LineHeight, "46px".to_string()));
        assert_eq!(decls[4], (StyleProperty::TextAlign, "center".to_string()));
        assert!(decls[0].1.starts_with("url(\"data:image/png;base64,"));
    }

    #[test]
    fn background_is_the_shipped_2x2_png() {
        const ALPHABET: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
        let payload = TRANSPARENT_PIXEL_DATA_URI
            .strip_prefix("data:image/png;base64,")
            .expect("png data uri");
        // First 32 chars hold the signature and the IHDR width/height.
        let mut header = Vec::new();
        for chunk in payload.as_bytes()[..32].chunks(4) {
            let mut bits = 0u32;
            for &c in chunk {
                let value = ALPHABET.iter().position(|&a| a == c).expect("base64") as u32;
                bits = (bits << 6) | value;
            }
            header.extend_from_slice(&bits.to_be_bytes()[1..]);
        }
        assert_eq!(&header[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(&header[12..16], b"IHDR");
        assert_eq!(header[16..20], 2u32.to_be_bytes());
        assert_eq!(header[20..24], 2u32.to_be_bytes());
    }

    #[test]
    fn integral_font_sizes_have_no_fraction() {
        assert_eq!(css_px(5.0), "5px");
        assert_eq!(css_px(15.0), "15px");
    }

    #[test]
    fn min_font_setter_rejects_nan() {
        let style = PlaceholderStyle::default().with_min_font_px(f64::NAN);
        assert_eq!(style.min_font_px, 0.0);
    }
}
