use wasm_bindgen::JsValue;
use web_sys::{HtmlCanvasElement, HtmlImageElement};

use crate::consts::{CANVAS_HEIGHT, CANVAS_WIDTH, LINE_HEIGHT_FACTOR, MIN_BLOCK_HEIGHT, MIN_BLOCK_WIDTH, MIN_FONT_SIZE};
use crate::doc::{BlockId, BlockSeed, BlockStore, PartialTextBlock, ResizePolicy, TextAlign, TextBlock};
use crate::geom::{Point, Size, Viewport, clamp_font_size, clamp_position, clamp_size};
use crate::hit::{self, Hit, HitPart};
use crate::input::{Button, GestureEvent, InputState, Key, Modifiers, UiState};
use crate::render;
use crate::retained::RetainedScene;
use crate::scene::{GestureKind, ReadBack, SceneSync};
use crate::text::TextMeasure;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    BlockAdded { id: BlockId },
    BlockUpdated { id: BlockId, fields: PartialTextBlock },
    BlockRemoved { id: BlockId },
    SelectionChanged { id: Option<BlockId> },
    /// The host should open its text editor over the block.
    EditTextRequested { id: BlockId, text: String },
    EditTextEnded { id: BlockId },
    SetCursor(String),
    RenderNeeded,
}

/// Per-editor settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Line height as a multiple of the font size.
    pub line_height_factor: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { canvas_width: CANVAS_WIDTH, canvas_height: CANVAS_HEIGHT, line_height_factor: LINE_HEIGHT_FACTOR }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn bounds(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }
}

/// Style changes from the side panel or context menu. Only present fields apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleEdit {
    pub color: Option<String>,
    pub font_size: Option<u32>,
    pub font_family: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub text_align: Option<TextAlign>,
}

/// Pointer-down on a block body that has not moved yet.
struct Press {
    id: BlockId,
    at: Point,
}

/// Core engine state: all logic that does not depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    doc: BlockStore,
    scene: SceneSync,
    viewport: Viewport,
    input: InputState,
    ui: UiState,
    config: EditorConfig,
    press: Option<Press>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let bounds = config.bounds();
        Self {
            doc: BlockStore::new(bounds),
            scene: SceneSync::new(RetainedScene::new(), bounds, config.line_height_factor),
            viewport: Viewport::default(),
            input: InputState::default(),
            ui: UiState::default(),
            config,
            press: None,
        }
    }

    // --- Template ---

    /// Replace every block with the template's and point the background at
    /// `background`. Returns the seeded ids and the background load ticket.
    pub fn load_template(&mut self, seeds: Vec<BlockSeed>, background: Option<String>) -> (Vec<BlockId>, u64) {
        self.scene.end_gesture();
        self.press = None;
        self.input = InputState::Idle;
        self.ui.editing_id = None;
        let ids = self.doc.seed_from_template(seeds);
        self.scene.sync(&self.doc);
        let ticket = self.scene.set_background_source(background);
        (ids, ticket)
    }

    /// Background image finished loading. Returns false for a stale ticket.
    pub fn background_loaded(&mut self, ticket: u64, natural: Size) -> bool {
        self.scene.on_background_loaded(ticket, natural)
    }

    /// Background image failed to load. The editor keeps working without it.
    pub fn background_failed(&mut self, ticket: u64, message: &str) -> bool {
        self.scene.on_background_failed(ticket, message)
    }

    /// Swap the text measure and re-flow auto-height blocks with it.
    pub fn set_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.scene.set_measure(measure);
        for id in self.doc.ids() {
            self.refresh_auto_height(&id);
        }
        self.scene.sync(&self.doc);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // --- Block operations ---

    /// Add a block of `kind` and select it.
    pub fn add_block(&mut self, kind: &str, seed: Option<BlockSeed>) -> (BlockId, Vec<Action>) {
        let mut actions = self.finish_gesture();
        let id = self.doc.add_block(kind, seed);
        self.refresh_auto_height(&id);
        actions.push(Action::BlockAdded { id: id.clone() });
        actions.extend(self.set_selected(Some(id.clone())));
        self.scene.sync(&self.doc);
        actions.push(Action::RenderNeeded);
        (id, actions)
    }

    /// Remove a block. Clears the selection if it was selected. Unknown ids are a no-op.
    pub fn remove_block(&mut self, id: &str) -> Vec<Action> {
        if !self.doc.contains(id) {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.selection().is_some_and(|sel| sel == id) {
            if self.input.in_gesture() {
                self.scene.end_gesture();
                self.input = InputState::Selected { id: id.to_owned() };
            }
            self.press = None;
            actions.extend(self.set_selected(None));
        }
        self.doc.remove_block(id);
        self.scene.sync(&self.doc);
        actions.push(Action::BlockRemoved { id: id.to_owned() });
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Apply side-panel style changes to a block.
    pub fn set_style(&mut self, id: &str, style: &StyleEdit) -> Vec<Action> {
        if !self.doc.contains(id) {
            return Vec::new();
        }
        let mut actions = self.finish_gesture();
        let mut fields = PartialTextBlock {
            color: style.color.clone(),
            font_size: style.font_size.map(|size| size.max(MIN_FONT_SIZE)),
            font_family: style.font_family.clone(),
            bold: style.bold,
            italic: style.italic,
            text_align: style.text_align,
            ..Default::default()
        };
        self.doc.update_block(id, &fields);
        fields.height = self.refresh_auto_height(id);
        self.scene.sync(&self.doc);
        actions.push(Action::BlockUpdated { id: id.to_owned(), fields });
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Selection ---

    pub fn select(&mut self, id: &str) -> Vec<Action> {
        if !self.doc.contains(id) {
            return Vec::new();
        }
        let mut actions = self.finish_gesture();
        actions.extend(self.set_selected(Some(id.to_owned())));
        actions
    }

    pub fn deselect(&mut self) -> Vec<Action> {
        let mut actions = self.finish_gesture();
        self.press = None;
        actions.extend(self.set_selected(None));
        actions
    }

    fn set_selected(&mut self, id: Option<BlockId>) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.ui.editing_id.is_some() && self.ui.editing_id != id {
            actions.extend(self.end_text_edit());
        }
        if self.selection() == id.as_ref() {
            return actions;
        }
        self.input = match id.clone() {
            Some(id) => InputState::Selected { id },
            None => InputState::Idle,
        };
        actions.push(Action::SelectionChanged { id });
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Text editing ---

    /// Enter text edit on a block, selecting it first.
    pub fn begin_text_edit(&mut self, id: &str) -> Vec<Action> {
        let Some(text) = self.doc.get(id).map(|b| b.text.clone()) else {
            return Vec::new();
        };
        let mut actions = self.finish_gesture();
        actions.extend(self.set_selected(Some(id.to_owned())));
        self.ui.editing_id = Some(id.to_owned());
        actions.push(Action::EditTextRequested { id: id.to_owned(), text });
        actions
    }

    /// Replace the edited block's text. Called on every keystroke.
    pub fn edit_text(&mut self, text: &str) -> Vec<Action> {
        let Some(id) = self.ui.editing_id.clone() else {
            return Vec::new();
        };
        let actions = self.write_text(&id, text);
        if actions.is_empty() {
            self.ui.editing_id = None;
        }
        actions
    }

    /// Replace a block's text from a form field. Selection and any in-canvas
    /// text edit are left alone. Unknown ids are a no-op.
    pub fn set_text(&mut self, id: &str, text: &str) -> Vec<Action> {
        if !self.doc.contains(id) {
            return Vec::new();
        }
        let mut actions = self.finish_gesture();
        actions.extend(self.write_text(id, text));
        actions
    }

    fn write_text(&mut self, id: &str, text: &str) -> Vec<Action> {
        let mut fields = PartialTextBlock { text: Some(text.to_owned()), ..Default::default() };
        if !self.doc.update_block(id, &fields) {
            return Vec::new();
        }
        fields.height = self.refresh_auto_height(id);
        self.scene.sync(&self.doc);
        vec![Action::BlockUpdated { id: id.to_owned(), fields }, Action::RenderNeeded]
    }

    pub fn end_text_edit(&mut self) -> Vec<Action> {
        match self.ui.editing_id.take() {
            Some(id) => vec![Action::EditTextEnded { id }],
            None => Vec::new(),
        }
    }

    /// Recompute an auto-height block's height from its wrapped text.
    fn refresh_auto_height(&mut self, id: &str) -> Option<f64> {
        let block = self.doc.get(id).filter(|b| b.resize_policy.auto_height())?;
        let height = self.scene.content_height(block);
        self.doc.update_block(id, &PartialTextBlock { height: Some(height), ..Default::default() });
        Some(height)
    }

    // --- Gestures ---

    /// Feed one gesture phase to the state machine.
    ///
    /// A start event while another gesture is running finalizes that gesture
    /// first. Deltas and ends without a matching gesture are ignored.
    pub fn apply_gesture(&mut self, event: GestureEvent) -> Vec<Action> {
        match event {
            GestureEvent::MoveStart { id, at } => self.start_gesture(id, at, GestureKind::Move),
            GestureEvent::ResizeStart { id, at } => self.start_gesture(id, at, GestureKind::Resize),
            GestureEvent::MoveDelta { dx, dy } => {
                if matches!(self.input, InputState::Dragging { .. }) && self.scene.preview_move(dx, dy) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            GestureEvent::ResizeDelta { dx, dy } => {
                if matches!(self.input, InputState::Resizing { .. }) && self.scene.preview_resize(dx, dy) {
                    vec![Action::RenderNeeded]
                } else {
                    Vec::new()
                }
            }
            GestureEvent::GestureEnd => self.finish_gesture(),
        }
    }

    fn start_gesture(&mut self, id: BlockId, at: Point, kind: GestureKind) -> Vec<Action> {
        let mut actions = self.finish_gesture();
        self.press = None;
        if !self.doc.contains(&id) {
            return actions;
        }
        actions.extend(self.set_selected(Some(id.clone())));

        let Some(block) = self.doc.get(&id) else {
            return actions;
        };
        let policy = block.resize_policy;
        if !self.scene.begin_gesture(block, kind) {
            return actions;
        }
        self.input = match kind {
            GestureKind::Move => InputState::Dragging { id, start: at },
            GestureKind::Resize => InputState::Resizing { id, start: at, policy },
        };
        actions
    }

    /// End the active gesture: read the node back, clamp, write the result
    /// into the store, and normalize the node.
    fn finish_gesture(&mut self) -> Vec<Action> {
        let (id, kind) = match &self.input {
            InputState::Dragging { id, .. } => (id.clone(), GestureKind::Move),
            InputState::Resizing { id, .. } => (id.clone(), GestureKind::Resize),
            InputState::Idle | InputState::Selected { .. } => return Vec::new(),
        };
        self.input = InputState::Selected { id: id.clone() };

        let fields = self
            .doc
            .get(&id)
            .and_then(|block| self.scene.read_back(block).map(|rb| self.clamp_read_back(block, rb, kind)));
        let Some(fields) = fields else {
            self.scene.end_gesture();
            return Vec::new();
        };

        self.scene.normalize(&id);
        self.scene.end_gesture();
        self.doc.update_block(&id, &fields);
        self.scene.sync(&self.doc);
        vec![Action::BlockUpdated { id, fields }, Action::RenderNeeded]
    }

    /// Enforce the size floors and canvas bounds on a gesture's final geometry.
    fn clamp_read_back(&self, block: &TextBlock, rb: ReadBack, kind: GestureKind) -> PartialTextBlock {
        let bounds = self.config.bounds();
        let origin = Point::new(rb.x, rb.y);

        if kind == GestureKind::Move {
            let pos = clamp_position(origin, block.size(), bounds);
            return PartialTextBlock { x: Some(pos.x), y: Some(pos.y), ..Default::default() };
        }

        let min = Size::new(MIN_BLOCK_WIDTH, MIN_BLOCK_HEIGHT);
        let max = Size::new((bounds.width - origin.x).max(0.0), (bounds.height - origin.y).max(0.0));
        // The wrap cap keeps its proportion to the width through the clamp.
        let wrap_for = |width: f64| rb.wrap_width * width / rb.width.max(f64::EPSILON);
        match block.resize_policy {
            ResizePolicy::Free => {
                let size = clamp_size(Size::new(rb.width, rb.height), min, max);
                let ratio = if rb.height > 0.0 { size.height / rb.height } else { 1.0 };
                let font_size = clamp_font_size(rb.font_size * ratio, MIN_FONT_SIZE);
                let pos = clamp_position(origin, size, bounds);
                PartialTextBlock {
                    x: Some(pos.x),
                    y: Some(pos.y),
                    width: Some(size.width),
                    height: Some(size.height),
                    max_width: Some(wrap_for(size.width)),
                    font_size: Some(font_size),
                    ..Default::default()
                }
            }
            ResizePolicy::FixedWidthAutogrow => {
                let width = clamp_size(Size::new(rb.width, MIN_BLOCK_HEIGHT), min, max).width;
                let mut reflowed = block.clone();
                reflowed.width = width;
                reflowed.max_width = wrap_for(width);
                let height = self.scene.content_height(&reflowed);
                let pos = clamp_position(origin, Size::new(width, height), bounds);
                PartialTextBlock {
                    x: Some(pos.x),
                    y: Some(pos.y),
                    width: Some(width),
                    height: Some(height),
                    max_width: Some(reflowed.max_width),
                    ..Default::default()
                }
            }
        }
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, display_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let pt = self.viewport.display_to_canvas(display_pt);
        let mut actions = self.finish_gesture();
        self.press = None;

        let selected = self.selection().cloned();
        match hit::hit_test(pt, &self.doc, selected.as_deref()) {
            Some(Hit { block_id, part: HitPart::ResizeHandle }) => {
                actions.extend(self.apply_gesture(GestureEvent::ResizeStart { id: block_id, at: pt }));
            }
            Some(Hit { block_id, part: HitPart::Body }) => {
                actions.extend(self.set_selected(Some(block_id.clone())));
                if self.ui.editing_id.as_ref() != Some(&block_id) {
                    self.press = Some(Press { id: block_id, at: pt });
                }
            }
            None => actions.extend(self.set_selected(None)),
        }
        actions
    }

    pub fn on_pointer_move(&mut self, display_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let pt = self.viewport.display_to_canvas(display_pt);

        if let Some(start) = self.input.gesture_start() {
            let (dx, dy) = pt.delta_from(start);
            return self.apply_gesture(self.delta_event(dx, dy));
        }

        if let Some(press) = self.press.take() {
            if pt == press.at {
                self.press = Some(press);
                return Vec::new();
            }
            let (dx, dy) = pt.delta_from(press.at);
            let mut actions = self.apply_gesture(GestureEvent::MoveStart { id: press.id, at: press.at });
            actions.extend(self.apply_gesture(GestureEvent::MoveDelta { dx, dy }));
            return actions;
        }

        self.hover_cursor(pt)
    }

    pub fn on_pointer_up(&mut self, display_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        self.press = None;
        let pt = self.viewport.display_to_canvas(display_pt);
        let Some(start) = self.input.gesture_start() else {
            return Vec::new();
        };
        let (dx, dy) = pt.delta_from(start);
        let mut actions = self.apply_gesture(self.delta_event(dx, dy));
        actions.extend(self.apply_gesture(GestureEvent::GestureEnd));
        actions
    }

    /// Double-click on a block enters text edit.
    pub fn on_double_click(&mut self, display_pt: Point) -> Vec<Action> {
        let pt = self.viewport.display_to_canvas(display_pt);
        let mut actions = self.finish_gesture();
        self.press = None;
        let selected = self.selection().cloned();
        if let Some(hit) = hit::hit_test(pt, &self.doc, selected.as_deref()) {
            actions.extend(self.begin_text_edit(&hit.block_id));
        }
        actions
    }

    pub fn on_key_down(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        if self.ui.editing_id.is_some() {
            return if key.is("Escape") { self.end_text_edit() } else { Vec::new() };
        }
        let Some(id) = self.selection().cloned() else {
            return Vec::new();
        };
        match key.0.as_str() {
            "Delete" | "Backspace" => self.remove_block(&id),
            "Escape" => self.deselect(),
            "Enter" => self.begin_text_edit(&id),
            _ => Vec::new(),
        }
    }

    fn delta_event(&self, dx: f64, dy: f64) -> GestureEvent {
        match self.input {
            InputState::Resizing { .. } => GestureEvent::ResizeDelta { dx, dy },
            _ => GestureEvent::MoveDelta { dx, dy },
        }
    }

    fn hover_cursor(&mut self, pt: Point) -> Vec<Action> {
        let selected = self.selection().map(String::as_str);
        let cursor = match hit::hit_test(pt, &self.doc, selected) {
            Some(Hit { part: HitPart::ResizeHandle, block_id }) => {
                match self.doc.get(&block_id).map(|b| b.resize_policy) {
                    Some(ResizePolicy::FixedWidthAutogrow) => "ew-resize",
                    _ => "nwse-resize",
                }
            }
            Some(Hit { part: HitPart::Body, .. }) => "move",
            None => "default",
        };
        if cursor == self.ui.cursor {
            return Vec::new();
        }
        self.ui.cursor = cursor;
        vec![Action::SetCursor(cursor.to_owned())]
    }

    // --- Queries ---

    /// The currently selected block, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&BlockId> {
        self.input.selected_id()
    }

    /// The block in text edit, if any.
    #[must_use]
    pub fn editing(&self) -> Option<&BlockId> {
        self.ui.editing_id.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> &InputState {
        &self.input
    }

    #[must_use]
    pub fn doc(&self) -> &BlockStore {
        &self.doc
    }

    #[must_use]
    pub fn scene(&self) -> &SceneSync {
        &self.scene
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn config(&self) -> EditorConfig {
        self.config
    }

    /// Look up a block by id.
    #[must_use]
    pub fn block(&self, id: &str) -> Option<&TextBlock> {
        self.doc.get(id)
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    background: Option<HtmlImageElement>,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// Text is measured with the canvas's own font metrics when a 2D context
    /// is available.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, config: EditorConfig) -> Self {
        let mut core = EngineCore::new(config);
        if let Ok(ctx) = render::context_2d(&canvas) {
            core.set_measure(Box::new(render::CanvasMeasure::new(ctx)));
        }
        Self { canvas, background: None, core }
    }

    pub fn load_template(&mut self, seeds: Vec<BlockSeed>, background: Option<String>) -> (Vec<BlockId>, u64) {
        self.background = None;
        self.core.load_template(seeds, background)
    }

    /// Hand over a loaded background image. Images for a superseded ticket are dropped.
    pub fn set_background_image(&mut self, ticket: u64, image: HtmlImageElement) -> Vec<Action> {
        let natural = Size::new(f64::from(image.natural_width()), f64::from(image.natural_height()));
        if !self.core.background_loaded(ticket, natural) {
            return Vec::new();
        }
        self.background = Some(image);
        vec![Action::RenderNeeded]
    }

    pub fn background_failed(&mut self, ticket: u64, message: &str) -> bool {
        self.core.background_failed(ticket, message)
    }

    // --- Delegated input events ---

    pub fn on_pointer_down(&mut self, display_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(display_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, display_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(display_pt, modifiers)
    }

    pub fn on_pointer_up(&mut self, display_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_up(display_pt, button, modifiers)
    }

    pub fn on_double_click(&mut self, display_pt: Point) -> Vec<Action> {
        self.core.on_double_click(display_pt)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn edit_text(&mut self, text: &str) -> Vec<Action> {
        self.core.edit_text(text)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = render::context_2d(&self.canvas)?;
        render::draw(&ctx, &self.core, self.background.as_ref())
    }
}
