//! Shared numeric constants for the canvas crate.

// ── Page ────────────────────────────────────────────────────────

/// Default editor canvas width in pixels (template page width).
pub const CANVAS_WIDTH: f64 = 715.0;

/// Default editor canvas height in pixels (template page height).
pub const CANVAS_HEIGHT: f64 = 1144.0;

// ── Size floors ─────────────────────────────────────────────────

/// Smallest width a block may have after any manipulation.
pub const MIN_BLOCK_WIDTH: f64 = 20.0;

/// Smallest height a block may have after any manipulation.
pub const MIN_BLOCK_HEIGHT: f64 = 20.0;

/// Smallest font size, in pixels.
pub const MIN_FONT_SIZE: u32 = 6;

// ── Text layout ─────────────────────────────────────────────────

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.25;

/// Average glyph advance as a fraction of the font size, used when no real
/// font metrics are available.
pub const APPROX_GLYPH_ADVANCE: f64 = 0.55;

/// Extra advance applied to bold runs by the approximate measure.
pub const APPROX_BOLD_FACTOR: f64 = 1.08;

// ── New blocks ──────────────────────────────────────────────────

/// Left edge of the first user-added block of a kind.
pub const NEW_BLOCK_X: f64 = 50.0;

/// Top edge of the first user-added block of a kind.
pub const NEW_BLOCK_Y: f64 = 100.0;

/// Diagonal step between successive user-added blocks of the same kind.
pub const NEW_BLOCK_CASCADE: f64 = 20.0;

/// Width of a user-added block.
pub const NEW_BLOCK_WIDTH: f64 = 200.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Half-extent of the square resize handle, in canvas pixels.
pub const HANDLE_RADIUS_PX: f64 = 6.0;

// ── Fonts ───────────────────────────────────────────────────────

/// Font choices offered by the style panel: display label and the font path
/// sent to the renderer. An empty path selects the renderer's system default.
pub const FONT_CATALOG: &[(&str, &str)] = &[
    ("DejaVu Sans", "/usr/share/fonts/dejavu/DejaVuSans.ttf"),
    ("Arial (system)", ""),
];
