//! Block model: text blocks, their style, and the keyed in-memory store.
//!
//! This module defines the editable text region placed over the template
//! background (`TextBlock`), a sparse-update type for incremental edits
//! (`PartialTextBlock`), the seed description used to populate the store from
//! a template (`BlockSeed`), and the store that owns all live blocks
//! (`BlockStore`).
//!
//! The store is the single source of truth for block state. The scene
//! synchronizer reads it after every event; the interaction controller mutates
//! it only through the operations defined here.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{
    LINE_HEIGHT_FACTOR, MIN_BLOCK_HEIGHT, MIN_BLOCK_WIDTH, MIN_FONT_SIZE, NEW_BLOCK_CASCADE, NEW_BLOCK_WIDTH,
    NEW_BLOCK_X, NEW_BLOCK_Y,
};
use crate::geom::{Point, Rect, Size, clamp_font_size, clamp_position, clamp_size};

/// Stable identifier for a text block.
pub type BlockId = String;

/// Kind given to blocks seeded from a template that carries no explicit type.
pub const TEMPLATE_KIND: &str = "TEMPLATE";

/// Horizontal alignment of wrapped lines inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// CSS / `Canvas2D` keyword for this alignment.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Which geometric fields a resize gesture is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResizePolicy {
    /// Corner resize: width, height, and font size all scale with the gesture.
    Free,
    /// Edge resize: only width changes; height follows the wrapped text.
    FixedWidthAutogrow,
}

impl ResizePolicy {
    /// Whether the block's height is derived from its wrapped content.
    #[must_use]
    pub fn auto_height(self) -> bool {
        matches!(self, Self::FixedWidthAutogrow)
    }
}

/// An editable text region placed over the template background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Unique identifier within the live collection.
    pub id: BlockId,
    /// Category tag (`"TITLE"`, `"DETAILS"`, `"TEMPLATE"`, ...). Drives default styling only.
    pub kind: String,
    /// Current text content.
    pub text: String,
    /// Left edge in canvas pixels.
    pub x: f64,
    /// Top edge in canvas pixels.
    pub y: f64,
    /// Wrap width in canvas pixels.
    pub width: f64,
    /// Box height in canvas pixels; derived from content under `FixedWidthAutogrow`.
    pub height: f64,
    /// Independent cap on the wrap width.
    pub max_width: f64,
    /// Font size in pixels.
    pub font_size: u32,
    /// Hex fill color, e.g. `"#000000"`.
    pub color: String,
    /// Font path or family name. Empty means the system default.
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub text_align: TextAlign,
    /// How resize gestures affect this block.
    pub resize_policy: ResizePolicy,
}

impl TextBlock {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Effective wrap width: the smaller of `width` and `max_width`.
    #[must_use]
    pub fn wrap_width(&self) -> f64 {
        if self.max_width > 0.0 {
            self.width.min(self.max_width)
        } else {
            self.width
        }
    }

    /// Text shown on the canvas. Empty blocks show their id as a placeholder.
    #[must_use]
    pub fn display_text(&self) -> &str {
        if self.text.is_empty() { &self.id } else { &self.text }
    }
}

/// Sparse update for a text block. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialTextBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize_policy: Option<ResizePolicy>,
}

/// Description of a block to create, either from a template definition or as
/// the starting point of a user-added block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSeed {
    /// Template-provided title; becomes the block id when seeding.
    #[serde(default)]
    pub title: Option<String>,
    /// Template-provided category tag.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub max_width: Option<f64>,
    pub font_size: u32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub font_family: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub text_align: TextAlign,
}

fn default_color() -> String {
    "#000000".to_owned()
}

/// Default style for a user-added block of a given kind.
struct KindDefaults {
    font_size: u32,
    bold: bool,
    placeholder: &'static str,
}

fn kind_defaults(kind: &str) -> KindDefaults {
    match kind.to_ascii_uppercase().as_str() {
        "TITLE" => KindDefaults { font_size: 28, bold: true, placeholder: "New Title" },
        "DETAILS" => KindDefaults { font_size: 14, bold: false, placeholder: "Add details here" },
        _ => KindDefaults { font_size: 16, bold: false, placeholder: "New Text Element" },
    }
}

/// In-memory store of text blocks, keyed by id.
pub struct BlockStore {
    blocks: HashMap<BlockId, TextBlock>,
    bounds: Size,
}

impl BlockStore {
    /// Create an empty store for a canvas of the given size.
    #[must_use]
    pub fn new(bounds: Size) -> Self {
        Self { blocks: HashMap::new(), bounds }
    }

    /// Canvas size that positions are clamped against.
    #[must_use]
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    /// Add a block of `kind` and return its freshly generated id.
    ///
    /// Without a seed, the block gets the kind's default style and placeholder
    /// text. Either way its position is cascaded to the first slot no other
    /// block of the same kind occupies, so repeated adds never overlap exactly,
    /// even after removals.
    pub fn add_block(&mut self, kind: &str, seed: Option<BlockSeed>) -> BlockId {
        let id = self.fresh_id(kind);
        let taken: Vec<Point> = self
            .blocks
            .values()
            .filter(|b| b.kind.eq_ignore_ascii_case(kind))
            .map(TextBlock::position)
            .collect();

        let mut block = match seed {
            Some(seed) => block_from_seed(id.clone(), kind.to_owned(), seed, ResizePolicy::FixedWidthAutogrow),
            None => {
                let defaults = kind_defaults(kind);
                TextBlock {
                    id: id.clone(),
                    kind: kind.to_owned(),
                    text: defaults.placeholder.to_owned(),
                    x: NEW_BLOCK_X,
                    y: NEW_BLOCK_Y,
                    width: NEW_BLOCK_WIDTH,
                    height: (f64::from(defaults.font_size) * LINE_HEIGHT_FACTOR).max(MIN_BLOCK_HEIGHT),
                    max_width: NEW_BLOCK_WIDTH,
                    font_size: defaults.font_size,
                    color: default_color(),
                    font_family: String::new(),
                    bold: defaults.bold,
                    italic: false,
                    text_align: TextAlign::Left,
                    resize_policy: ResizePolicy::FixedWidthAutogrow,
                }
            }
        };
        let mut pos = clamp_position(block.position(), block.size(), self.bounds);
        for slot in 1..=taken.len() {
            if !taken.contains(&pos) {
                break;
            }
            #[allow(clippy::cast_precision_loss)]
            let cascade = slot as f64 * NEW_BLOCK_CASCADE;
            pos = clamp_position(Point::new(block.x + cascade, block.y + cascade), block.size(), self.bounds);
        }
        block.x = pos.x;
        block.y = pos.y;

        self.blocks.insert(id.clone(), block);
        id
    }

    /// Remove a block by id, returning it if it was present. Absent ids are a no-op.
    pub fn remove_block(&mut self, id: &str) -> Option<TextBlock> {
        self.blocks.remove(id)
    }

    /// Merge a partial update into an existing block. Returns false if the block doesn't exist.
    ///
    /// Numeric fields are applied as given; callers clamp before calling.
    pub fn update_block(&mut self, id: &str, partial: &PartialTextBlock) -> bool {
        let Some(block) = self.blocks.get_mut(id) else {
            return false;
        };
        if let Some(ref text) = partial.text {
            block.text.clone_from(text);
        }
        if let Some(x) = partial.x {
            block.x = x;
        }
        if let Some(y) = partial.y {
            block.y = y;
        }
        if let Some(w) = partial.width {
            block.width = w;
        }
        if let Some(h) = partial.height {
            block.height = h;
        }
        if let Some(mw) = partial.max_width {
            block.max_width = mw;
        }
        if let Some(fs) = partial.font_size {
            block.font_size = fs;
        }
        if let Some(ref color) = partial.color {
            block.color.clone_from(color);
        }
        if let Some(ref family) = partial.font_family {
            block.font_family.clone_from(family);
        }
        if let Some(bold) = partial.bold {
            block.bold = bold;
        }
        if let Some(italic) = partial.italic {
            block.italic = italic;
        }
        if let Some(align) = partial.text_align {
            block.text_align = align;
        }
        if let Some(policy) = partial.resize_policy {
            block.resize_policy = policy;
        }
        true
    }

    /// Replace the entire collection with blocks built from template seeds.
    ///
    /// Ids come from the seed title when present (duplicates get `-2`, `-3`,
    /// ... suffixes in source order) and from the source index otherwise.
    /// Returns the assigned ids in source order.
    pub fn seed_from_template(&mut self, seeds: Vec<BlockSeed>) -> Vec<BlockId> {
        self.blocks.clear();
        let mut taken: HashSet<BlockId> = HashSet::new();
        let mut ids = Vec::with_capacity(seeds.len());

        for (index, seed) in seeds.into_iter().enumerate() {
            let base = seed
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map_or_else(|| format!("block-{}", index + 1), str::to_owned);
            let id = disambiguate(&base, &taken);
            taken.insert(id.clone());

            let kind = seed
                .kind
                .clone()
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| TEMPLATE_KIND.to_owned());
            let mut block = block_from_seed(id.clone(), kind, seed, ResizePolicy::Free);
            let pos = clamp_position(block.position(), block.size(), self.bounds);
            block.x = pos.x;
            block.y = pos.y;

            self.blocks.insert(id.clone(), block);
            ids.push(id);
        }
        ids
    }

    /// Return a reference to a block by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TextBlock> {
        self.blocks.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// All block ids in stable (lexicographic) order.
    #[must_use]
    pub fn ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.blocks.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All blocks in stable (lexicographic id) order.
    #[must_use]
    pub fn sorted_blocks(&self) -> Vec<&TextBlock> {
        let mut blocks: Vec<&TextBlock> = self.blocks.values().collect();
        blocks.sort_by(|a, b| a.id.cmp(&b.id));
        blocks
    }

    /// Number of blocks currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if the store contains no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Drop every block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    fn fresh_id(&self, kind: &str) -> BlockId {
        let slug = slugify(kind);
        loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let candidate = format!("{slug}-{}", &suffix[..8]);
            if !self.blocks.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new(Size::new(crate::consts::CANVAS_WIDTH, crate::consts::CANVAS_HEIGHT))
    }
}

fn block_from_seed(id: BlockId, kind: String, seed: BlockSeed, resize_policy: ResizePolicy) -> TextBlock {
    let size = clamp_size(
        Size::new(seed.width, seed.height),
        Size::new(MIN_BLOCK_WIDTH, MIN_BLOCK_HEIGHT),
        Size::new(f64::INFINITY, f64::INFINITY),
    );
    let max_width = seed
        .max_width
        .filter(|mw| *mw > 0.0)
        .unwrap_or(size.width);
    TextBlock {
        id,
        kind,
        text: seed.text,
        x: seed.x,
        y: seed.y,
        width: size.width,
        height: size.height,
        max_width,
        font_size: clamp_font_size(f64::from(seed.font_size), MIN_FONT_SIZE),
        color: if seed.color.is_empty() { default_color() } else { seed.color },
        font_family: seed.font_family,
        bold: seed.bold,
        italic: seed.italic,
        text_align: seed.text_align,
        resize_policy,
    }
}

fn disambiguate(base: &str, taken: &HashSet<BlockId>) -> BlockId {
    if !taken.contains(base) {
        return base.to_owned();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn slugify(kind: &str) -> String {
    let slug: String = kind
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "block".to_owned() } else { slug.to_owned() }
}
