//! Text measurement and greedy word wrapping.
//!
//! Wrapping follows the renderer's rules so the on-canvas preview matches the
//! generated image: explicit newlines always break, each paragraph wraps word
//! by word within the wrap width, and a word longer than the width sits on a
//! line of its own rather than being split.

#[cfg(test)]
#[path = "text_test.rs"]
mod text_test;

use crate::consts::{APPROX_BOLD_FACTOR, APPROX_GLYPH_ADVANCE, FONT_CATALOG};

/// Font parameters that affect measured width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec<'a> {
    pub family: &'a str,
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

/// Measures the advance width of a run of text.
pub trait TextMeasure {
    /// Width in canvas pixels of `text` set in `font`.
    fn text_width(&self, text: &str, font: &FontSpec<'_>) -> f64;
}

/// Metric-free measure: every glyph advances a fixed fraction of the font size.
///
/// Used natively and whenever real font metrics are unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn text_width(&self, text: &str, font: &FontSpec<'_>) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let glyphs = text.chars().count() as f64;
        let advance = font.size * APPROX_GLYPH_ADVANCE;
        let width = glyphs * advance;
        if font.bold { width * APPROX_BOLD_FACTOR } else { width }
    }
}

/// Wrap `text` into lines no wider than `max_width`.
///
/// Blank paragraphs are preserved as empty lines. A non-positive width
/// disables wrapping (newlines still break).
#[must_use]
pub fn wrap_lines(text: &str, max_width: f64, font: &FontSpec<'_>, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut words = paragraph.split_whitespace();
        let Some(first) = words.next() else {
            lines.push(String::new());
            continue;
        };
        if max_width <= 0.0 {
            lines.push(paragraph.trim_end().to_owned());
            continue;
        }

        let mut current = first.to_owned();
        for word in words {
            let candidate = format!("{current} {word}");
            if measure.text_width(&candidate, font) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_owned()));
            }
        }
        lines.push(current);
    }
    lines
}

/// Height of `line_count` lines; an empty block still occupies one line.
#[must_use]
pub fn content_height(line_count: usize, font_size: f64, line_height_factor: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let lines = line_count.max(1) as f64;
    lines * font_size * line_height_factor
}

/// Font path for a catalog label (case-insensitive). An empty path means the
/// renderer's system default.
#[must_use]
pub fn font_path(label: &str) -> Option<&'static str> {
    FONT_CATALOG
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label.trim()))
        .map(|(_, path)| *path)
}
