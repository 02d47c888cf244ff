//! Rendering: draws the retained scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads the synchronizer's retained scene and the controller's selection
//! and produces pixels — it does not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::TextAlign;
use crate::engine::EngineCore;
use crate::hit;
use crate::retained::TextNode;
use crate::text::{ApproxMeasure, FontSpec, TextMeasure, wrap_lines};

/// Selection dash segment length in display pixels.
const SELECTION_DASH_PX: f64 = 4.0;

/// Fill used for placeholder text.
const PLACEHOLDER_COLOR: &str = "#9AA0A6";

const SELECTION_COLOR: &str = "#1E90FF";

/// Fetch the canvas's 2D context.
///
/// # Errors
///
/// Returns `Err` if the browser refuses the context or returns another kind.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

/// CSS font shorthand for a font spec.
///
/// Font paths cannot be named in CSS, so anything that looks like a path
/// falls back to the generic family.
#[must_use]
pub fn font_string(font: &FontSpec<'_>) -> String {
    let style = if font.italic { "italic " } else { "" };
    let weight = if font.bold { "bold " } else { "" };
    let family = if font.family.is_empty() || font.family.contains('/') {
        "sans-serif".to_owned()
    } else {
        format!("\"{}\", sans-serif", font.family)
    };
    format!("{style}{weight}{size}px {family}", size = font.size)
}

/// Measures text with the browser's font metrics.
pub struct CanvasMeasure {
    ctx: CanvasRenderingContext2d,
}

impl CanvasMeasure {
    #[must_use]
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }
}

impl TextMeasure for CanvasMeasure {
    fn text_width(&self, text: &str, font: &FontSpec<'_>) -> f64 {
        self.ctx.save();
        self.ctx.set_font(&font_string(font));
        let width = match self.ctx.measure_text(text) {
            Ok(metrics) => metrics.width(),
            Err(_) => ApproxMeasure.text_width(text, font),
        };
        self.ctx.restore();
        width
    }
}

/// Draw the full scene: page, background, text nodes, and selection UI.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    core: &EngineCore,
    background: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    let scene = core.scene();
    let viewport = core.viewport();
    let bounds = core.config().bounds();

    // Layer 1: page.
    ctx.set_transform(viewport.scale, 0.0, 0.0, viewport.scale, viewport.offset_x, viewport.offset_y)?;
    ctx.clear_rect(0.0, 0.0, bounds.width, bounds.height);
    ctx.set_fill_style_str("#FFFFFF");
    ctx.fill_rect(0.0, 0.0, bounds.width, bounds.height);

    // Layer 2: background image.
    if let (Some(node), Some(image)) = (scene.backend().background(), background) {
        let p = node.placement;
        ctx.draw_image_with_html_image_element_and_dw_and_dh(image, p.x, p.y, p.width, p.height)?;
    }

    // Layer 3: text.
    for (_, node) in scene.backend().text_nodes() {
        draw_text_node(ctx, node, scene.measure(), scene.line_height_factor())?;
    }

    // Layer 4: selection UI.
    if let Some(node) = core
        .selection()
        .and_then(|id| scene.node_for(id))
        .and_then(|id| scene.backend().node(id))
    {
        draw_selection(ctx, node, viewport.scale)?;
    }

    Ok(())
}

fn draw_text_node(
    ctx: &CanvasRenderingContext2d,
    node: &TextNode,
    measure: &dyn TextMeasure,
    line_height_factor: f64,
) -> Result<(), JsValue> {
    let props = &node.props;
    let font = props.font();

    ctx.save();
    ctx.translate(props.left, props.top)?;
    ctx.scale(node.scale_x, node.scale_y)?;

    ctx.set_fill_style_str(if props.placeholder { PLACEHOLDER_COLOR } else { props.color.as_str() });
    ctx.set_font(&font_string(&font));
    ctx.set_text_baseline("top");
    ctx.set_text_align(props.text_align.as_str());

    let x = match props.text_align {
        TextAlign::Left => 0.0,
        TextAlign::Center => props.wrap_width / 2.0,
        TextAlign::Right => props.wrap_width,
    };
    let line_height = props.font_size * line_height_factor;
    let mut y = 0.0;
    for line in wrap_lines(&props.text, props.wrap_width, &font, measure) {
        ctx.fill_text(&line, x, y)?;
        y += line_height;
    }

    ctx.restore();
    Ok(())
}

fn draw_selection(ctx: &CanvasRenderingContext2d, node: &TextNode, zoom: f64) -> Result<(), JsValue> {
    let bounds = node.geometry().bounds();
    let dash = SELECTION_DASH_PX / zoom;

    ctx.save();
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(1.0 / zoom);
    let dash_array = js_sys::Array::new();
    dash_array.push(&dash.into());
    dash_array.push(&dash.into());
    ctx.set_line_dash(&dash_array)?;
    ctx.stroke_rect(bounds.x, bounds.y, bounds.width, bounds.height);
    ctx.set_line_dash(&js_sys::Array::new())?;

    let handle = hit::handle_position(bounds, node.props.resize_policy);
    let half = HANDLE_RADIUS_PX / zoom;
    ctx.set_fill_style_str("#fff");
    ctx.fill_rect(handle.x - half, handle.y - half, half * 2.0, half * 2.0);
    ctx.stroke_rect(handle.x - half, handle.y - half, half * 2.0, half * 2.0);

    ctx.restore();
    Ok(())
}
