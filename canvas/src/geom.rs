//! Geometry primitives and the bounds-checking math every gesture ends with.
//!
//! All coordinates are canvas pixels with a top-left origin. [`Viewport`]
//! converts display pixels (where pointer events arrive) into canvas pixels
//! when the page is shown scaled.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

/// A point in either display or canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise offset from `origin` to `self`.
    #[must_use]
    pub fn delta_from(self, origin: Point) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }
}

/// A width/height pair in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whether `pt` lies inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.width && pt.y >= self.y && pt.y <= self.y + self.height
    }

    /// Bottom-right corner.
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Clamp a top-left position so that a box of `size` stays inside `bounds`:
/// `0 <= x <= bounds.width - size.width`, and the same for `y`.
///
/// When the box is larger than the bounds on an axis, that axis pins to 0.
#[must_use]
pub fn clamp_position(pos: Point, size: Size, bounds: Size) -> Point {
    let max_x = (bounds.width - size.width).max(0.0);
    let max_y = (bounds.height - size.height).max(0.0);
    Point::new(clamp_or_floor(pos.x, 0.0, max_x), clamp_or_floor(pos.y, 0.0, max_y))
}

/// Clamp a size between `min` and `max` on each axis. `min` wins when the
/// two cross, so the floor is never violated.
#[must_use]
pub fn clamp_size(size: Size, min: Size, max: Size) -> Size {
    Size::new(
        clamp_or_floor(size.width, min.width, max.width),
        clamp_or_floor(size.height, min.height, max.height),
    )
}

/// Clamp a font size to `min`, rounding to whole pixels.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_font_size(size: f64, min: u32) -> u32 {
    if !size.is_finite() || size <= f64::from(min) {
        return min;
    }
    // Saturating: anything past u32::MAX is not a meaningful font size.
    let rounded = size.round();
    if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

/// Fit `natural` inside `container`, preserving aspect ratio, centered.
///
/// Returns the placement rectangle in container coordinates. Degenerate
/// natural sizes produce an empty rectangle at the container center.
#[must_use]
pub fn fit_contain(natural: Size, container: Size) -> Rect {
    if natural.width <= 0.0 || natural.height <= 0.0 {
        return Rect::new(container.width / 2.0, container.height / 2.0, 0.0, 0.0);
    }
    let scale = (container.width / natural.width).min(container.height / natural.height);
    let width = natural.width * scale;
    let height = natural.height * scale;
    Rect::new((container.width - width) / 2.0, (container.height - height) / 2.0, width, height)
}

fn clamp_or_floor(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() {
        return lo;
    }
    if hi < lo {
        return lo;
    }
    v.clamp(lo, hi)
}

/// Display transform for a page shown scaled inside its host element.
///
/// `scale` is display pixels per canvas pixel (1.0 = page shown at native size).
/// `offset_x` / `offset_y` are the display-space position of the page origin.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { offset_x: 0.0, offset_y: 0.0, scale: 1.0 }
    }
}

impl Viewport {
    /// Convert a display-space point to canvas coordinates.
    #[must_use]
    pub fn display_to_canvas(&self, display: Point) -> Point {
        Point {
            x: (display.x - self.offset_x) / self.scale,
            y: (display.y - self.offset_y) / self.scale,
        }
    }

    /// Convert a canvas-space point to display coordinates.
    #[must_use]
    pub fn canvas_to_display(&self, canvas: Point) -> Point {
        Point {
            x: canvas.x * self.scale + self.offset_x,
            y: canvas.y * self.scale + self.offset_y,
        }
    }

    /// Convert a display-space distance to canvas distance.
    #[must_use]
    pub fn display_dist_to_canvas(&self, dist: f64) -> f64 {
        dist / self.scale
    }
}
