//! Scene synchronizer: keeps a retained scene graph consistent with the block
//! store.
//!
//! The synchronizer is the only code that touches scene nodes. It mirrors the
//! store after every event ([`SceneSync::sync`]), shows live gesture previews
//! without touching the store, and reads the final geometry of a gesture back
//! out ([`SceneSync::read_back`]) before baking the node's scale transform to
//! unity ([`SceneSync::normalize`]).
//!
//! The node representation lives behind [`SceneBackend`] so that nothing
//! outside this module depends on how nodes are stored or drawn.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::collections::HashMap;

use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH, LINE_HEIGHT_FACTOR, MIN_BLOCK_HEIGHT, MIN_BLOCK_WIDTH};
use crate::doc::{BlockId, BlockStore, ResizePolicy, TextAlign, TextBlock};
use crate::geom::{Rect, Size, fit_contain};
use crate::retained::RetainedScene;
use crate::text::{ApproxMeasure, FontSpec, TextMeasure, content_height, wrap_lines};

/// Opaque handle to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Everything a backend needs to draw one text node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextProps {
    /// Block this node mirrors.
    pub block_id: BlockId,
    /// Text to display; the block id stands in for empty text.
    pub text: String,
    /// Whether `text` is a placeholder rather than block content.
    pub placeholder: bool,
    pub left: f64,
    pub top: f64,
    /// Node box width, the block's width.
    pub width: f64,
    /// Width the text wraps at; never wider than `width`.
    pub wrap_width: f64,
    pub height: f64,
    pub font_size: f64,
    pub font_family: String,
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub text_align: TextAlign,
    pub resize_policy: ResizePolicy,
}

impl TextProps {
    #[must_use]
    pub fn font(&self) -> FontSpec<'_> {
        FontSpec { family: &self.font_family, size: self.font_size, bold: self.bold, italic: self.italic }
    }
}

/// Geometry of a node as the backend holds it, including any pending scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub wrap_width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub font_size: f64,
}

impl NodeGeometry {
    /// On-screen bounds with the scale applied.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.left, self.top, self.width * self.scale_x, self.height * self.scale_y)
    }
}

/// The template background: never selectable and never a hit-test target.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundNode {
    pub source: String,
    pub natural: Size,
    /// Aspect-preserving placement, centered in the canvas.
    pub placement: Rect,
}

/// Storage and drawing seam for scene nodes.
pub trait SceneBackend {
    /// Create a text node and return its handle.
    fn create_text(&mut self, props: TextProps) -> NodeId;
    /// Replace a node's props and reset its scale to 1. Returns false if the node is gone.
    fn update_text(&mut self, node: NodeId, props: TextProps) -> bool;
    /// Remove a node. Returns false if it was already gone.
    fn remove(&mut self, node: NodeId) -> bool;
    /// Install or clear the background node.
    fn set_background(&mut self, background: Option<BackgroundNode>);
    /// Current geometry of a node.
    fn geometry(&self, node: NodeId) -> Option<NodeGeometry>;
    /// Overwrite a node's geometry and scale. Returns false if the node is gone.
    fn set_geometry(&mut self, node: NodeId, geometry: NodeGeometry) -> bool;
}

/// Which kind of direct manipulation is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize,
}

/// Final geometry of a manipulated node, in canvas pixels, before clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadBack {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub wrap_width: f64,
    pub height: f64,
    pub font_size: f64,
}

struct ActiveGesture {
    block_id: BlockId,
    node: NodeId,
    kind: GestureKind,
    policy: ResizePolicy,
    origin: NodeGeometry,
    text: String,
    font_family: String,
    bold: bool,
    italic: bool,
}

#[derive(Default)]
struct BackgroundState {
    ticket: u64,
    source: Option<String>,
    error: Option<String>,
}

/// Binds a [`BlockStore`] to a scene backend.
pub struct SceneSync<B: SceneBackend = RetainedScene> {
    backend: B,
    nodes: HashMap<BlockId, NodeId>,
    active: Option<ActiveGesture>,
    measure: Box<dyn TextMeasure>,
    bounds: Size,
    line_height_factor: f64,
    background: BackgroundState,
}

impl Default for SceneSync<RetainedScene> {
    fn default() -> Self {
        Self::new(RetainedScene::new(), Size::new(CANVAS_WIDTH, CANVAS_HEIGHT), LINE_HEIGHT_FACTOR)
    }
}

impl<B: SceneBackend> SceneSync<B> {
    #[must_use]
    pub fn new(backend: B, bounds: Size, line_height_factor: f64) -> Self {
        Self {
            backend,
            nodes: HashMap::new(),
            active: None,
            measure: Box::new(ApproxMeasure),
            bounds,
            line_height_factor,
            background: BackgroundState::default(),
        }
    }

    /// Replace the text measure used for wrapping and auto-height.
    pub fn set_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    #[must_use]
    pub fn measure(&self) -> &dyn TextMeasure {
        self.measure.as_ref()
    }

    #[must_use]
    pub fn line_height_factor(&self) -> f64 {
        self.line_height_factor
    }

    #[must_use]
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Node currently mirroring `block_id`.
    #[must_use]
    pub fn node_for(&self, block_id: &str) -> Option<NodeId> {
        self.nodes.get(block_id).copied()
    }

    /// Height of the block's wrapped text, floored at the minimum block height.
    #[must_use]
    pub fn content_height(&self, block: &TextBlock) -> f64 {
        let font = FontSpec {
            family: &block.font_family,
            size: f64::from(block.font_size),
            bold: block.bold,
            italic: block.italic,
        };
        self.wrapped_height(block.display_text(), block.wrap_width(), &font)
    }

    fn wrapped_height(&self, text: &str, width: f64, font: &FontSpec<'_>) -> f64 {
        let lines = wrap_lines(text, width, font, self.measure.as_ref());
        content_height(lines.len(), font.size, self.line_height_factor).max(MIN_BLOCK_HEIGHT)
    }

    // =============================================================
    // Store mirroring
    // =============================================================

    /// Bring the scene in line with the store: create nodes for new blocks,
    /// update existing ones, and delete nodes whose block is gone.
    ///
    /// The node under an active gesture keeps its preview geometry.
    pub fn sync(&mut self, doc: &BlockStore) {
        let stale: Vec<BlockId> = self.nodes.keys().filter(|id| !doc.contains(id)).cloned().collect();
        for id in stale {
            if let Some(node) = self.nodes.remove(&id) {
                self.backend.remove(node);
            }
            if self.active.as_ref().is_some_and(|a| a.block_id == id) {
                self.active = None;
            }
        }

        for block in doc.sorted_blocks() {
            if self.active.as_ref().is_some_and(|a| a.block_id == block.id) {
                continue;
            }
            let props = self.props_for(block);
            if let Some(&node) = self.nodes.get(&block.id) {
                if self.backend.update_text(node, props.clone()) {
                    continue;
                }
            }
            let node = self.backend.create_text(props);
            self.nodes.insert(block.id.clone(), node);
        }
    }

    fn props_for(&self, block: &TextBlock) -> TextProps {
        let height = if block.resize_policy.auto_height() {
            self.content_height(block)
        } else {
            block.height
        };
        TextProps {
            block_id: block.id.clone(),
            text: block.display_text().to_owned(),
            placeholder: block.text.is_empty(),
            left: block.x,
            top: block.y,
            width: block.width,
            wrap_width: block.wrap_width(),
            height,
            font_size: f64::from(block.font_size),
            font_family: block.font_family.clone(),
            color: block.color.clone(),
            bold: block.bold,
            italic: block.italic,
            text_align: block.text_align,
            resize_policy: block.resize_policy,
        }
    }

    // =============================================================
    // Gestures
    // =============================================================

    /// Start previewing a gesture on `block`. Returns false if another gesture
    /// is active or the block has no node.
    pub fn begin_gesture(&mut self, block: &TextBlock, kind: GestureKind) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(node) = self.node_for(&block.id) else {
            return false;
        };
        let Some(origin) = self.backend.geometry(node) else {
            return false;
        };
        self.active = Some(ActiveGesture {
            block_id: block.id.clone(),
            node,
            kind,
            policy: block.resize_policy,
            origin,
            text: block.display_text().to_owned(),
            font_family: block.font_family.clone(),
            bold: block.bold,
            italic: block.italic,
        });
        true
    }

    /// Block and kind of the active gesture.
    #[must_use]
    pub fn active_gesture(&self) -> Option<(&str, GestureKind)> {
        self.active.as_ref().map(|a| (a.block_id.as_str(), a.kind))
    }

    /// Show the active move offset by `(dx, dy)` from where it started.
    pub fn preview_move(&mut self, dx: f64, dy: f64) -> bool {
        let Some(active) = self.active.as_ref().filter(|a| a.kind == GestureKind::Move) else {
            return false;
        };
        let geometry = NodeGeometry { left: active.origin.left + dx, top: active.origin.top + dy, ..active.origin };
        self.backend.set_geometry(active.node, geometry)
    }

    /// Show the active resize with the handle dragged `(dx, dy)` from where it
    /// started.
    ///
    /// `Free` nodes keep their base size and take a scale transform, which
    /// also scales the glyphs. `FixedWidthAutogrow` nodes change width directly
    /// and re-flow their height; the font never changes.
    pub fn preview_resize(&mut self, dx: f64, dy: f64) -> bool {
        let Some(active) = self.active.as_ref().filter(|a| a.kind == GestureKind::Resize) else {
            return false;
        };
        let origin = active.origin;
        let width = (origin.width * origin.scale_x + dx).max(MIN_BLOCK_WIDTH);
        let ratio = width / (origin.width * origin.scale_x).max(f64::EPSILON);
        let geometry = match active.policy {
            ResizePolicy::Free => {
                let height = (origin.height * origin.scale_y + dy).max(MIN_BLOCK_HEIGHT);
                NodeGeometry {
                    scale_x: width / origin.width.max(f64::EPSILON),
                    scale_y: height / origin.height.max(f64::EPSILON),
                    ..origin
                }
            }
            ResizePolicy::FixedWidthAutogrow => {
                let font = FontSpec {
                    family: &active.font_family,
                    size: origin.font_size,
                    bold: active.bold,
                    italic: active.italic,
                };
                let wrap_width = origin.wrap_width * origin.scale_x * ratio;
                let height = self.wrapped_height(&active.text, wrap_width, &font);
                NodeGeometry { width, wrap_width, height, scale_x: 1.0, scale_y: 1.0, ..origin }
            }
        };
        let node = active.node;
        self.backend.set_geometry(node, geometry)
    }

    /// Final geometry of `block`'s node with any scale folded in. The wrap
    /// width scales with the node width.
    ///
    /// Under `Free`, height and font size scale with the vertical factor.
    /// Under `FixedWidthAutogrow`, height is re-derived from the wrapped text
    /// at the new width and the font size is unchanged.
    #[must_use]
    pub fn read_back(&self, block: &TextBlock) -> Option<ReadBack> {
        let node = self.node_for(&block.id)?;
        let g = self.backend.geometry(node)?;
        let width = g.width * g.scale_x;
        let wrap_width = g.wrap_width * g.scale_x;
        let (height, font_size) = match block.resize_policy {
            ResizePolicy::Free => (g.height * g.scale_y, g.font_size * g.scale_y),
            ResizePolicy::FixedWidthAutogrow => {
                let font = FontSpec {
                    family: &block.font_family,
                    size: g.font_size,
                    bold: block.bold,
                    italic: block.italic,
                };
                (self.wrapped_height(block.display_text(), wrap_width, &font), g.font_size)
            }
        };
        Some(ReadBack { x: g.left, y: g.top, width, wrap_width, height, font_size })
    }

    /// Bake any pending scale on `block_id`'s node into its size and font so
    /// the scale factors return to 1.
    pub fn normalize(&mut self, block_id: &str) -> bool {
        let Some(node) = self.node_for(block_id) else {
            return false;
        };
        let Some(g) = self.backend.geometry(node) else {
            return false;
        };
        let baked = NodeGeometry {
            left: g.left,
            top: g.top,
            width: g.width * g.scale_x,
            wrap_width: g.wrap_width * g.scale_x,
            height: g.height * g.scale_y,
            scale_x: 1.0,
            scale_y: 1.0,
            font_size: g.font_size * g.scale_y,
        };
        self.backend.set_geometry(node, baked)
    }

    /// Stop previewing. Returns the block the gesture was on.
    pub fn end_gesture(&mut self) -> Option<BlockId> {
        self.active.take().map(|a| a.block_id)
    }

    // =============================================================
    // Background
    // =============================================================

    /// Point the background at a new image reference and return the ticket a
    /// load completion must present. Clears the current background.
    pub fn set_background_source(&mut self, source: Option<String>) -> u64 {
        self.background.ticket += 1;
        self.background.source = source;
        self.background.error = None;
        self.backend.set_background(None);
        self.background.ticket
    }

    /// Install the loaded background, fitted and centered. Loads for a
    /// superseded ticket are ignored and return false.
    pub fn on_background_loaded(&mut self, ticket: u64, natural: Size) -> bool {
        if ticket != self.background.ticket {
            return false;
        }
        let Some(source) = self.background.source.clone() else {
            return false;
        };
        let placement = fit_contain(natural, self.bounds);
        self.backend.set_background(Some(BackgroundNode { source, natural, placement }));
        true
    }

    /// Record a background load failure. The editor stays usable without one.
    pub fn on_background_failed(&mut self, ticket: u64, message: &str) -> bool {
        if ticket != self.background.ticket {
            return false;
        }
        self.background.error = Some(message.to_owned());
        true
    }

    #[must_use]
    pub fn background_source(&self) -> Option<&str> {
        self.background.source.as_deref()
    }

    #[must_use]
    pub fn background_error(&self) -> Option<&str> {
        self.background.error.as_deref()
    }
}
