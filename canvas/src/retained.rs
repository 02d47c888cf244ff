//! In-memory retained scene graph.
//!
//! [`RetainedScene`] is the default [`SceneBackend`]: a flat set of text nodes
//! plus an optional background image node. The browser painter in
//! [`crate::render`] draws straight from it, and tests inspect it directly.

#[cfg(test)]
#[path = "retained_test.rs"]
mod retained_test;

use std::collections::BTreeMap;

use crate::scene::{BackgroundNode, NodeGeometry, NodeId, SceneBackend, TextProps};

/// A text node: the props last pushed by the synchronizer plus the pending
/// scale transform left by a corner resize.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub props: TextProps,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl TextNode {
    fn new(props: TextProps) -> Self {
        Self { props, scale_x: 1.0, scale_y: 1.0 }
    }

    #[must_use]
    pub fn geometry(&self) -> NodeGeometry {
        NodeGeometry {
            left: self.props.left,
            top: self.props.top,
            width: self.props.width,
            wrap_width: self.props.wrap_width,
            height: self.props.height,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            font_size: self.props.font_size,
        }
    }
}

/// Flat retained scene. Node ids are never reused.
#[derive(Debug, Default)]
pub struct RetainedScene {
    nodes: BTreeMap<NodeId, TextNode>,
    next_id: u64,
    background: Option<BackgroundNode>,
}

impl RetainedScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text nodes in creation order.
    pub fn text_nodes(&self) -> impl Iterator<Item = (NodeId, &TextNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TextNode> {
        self.nodes.get(&id)
    }

    /// Reverse lookup from a node to the block it mirrors.
    #[must_use]
    pub fn block_for(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.props.block_id.as_str())
    }

    #[must_use]
    pub fn background(&self) -> Option<&BackgroundNode> {
        self.background.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SceneBackend for RetainedScene {
    fn create_text(&mut self, props: TextProps) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, TextNode::new(props));
        id
    }

    fn update_text(&mut self, node: NodeId, props: TextProps) -> bool {
        match self.nodes.get_mut(&node) {
            Some(existing) => {
                *existing = TextNode::new(props);
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, node: NodeId) -> bool {
        self.nodes.remove(&node).is_some()
    }

    fn set_background(&mut self, background: Option<BackgroundNode>) {
        self.background = background;
    }

    fn geometry(&self, node: NodeId) -> Option<NodeGeometry> {
        self.nodes.get(&node).map(TextNode::geometry)
    }

    fn set_geometry(&mut self, node: NodeId, geometry: NodeGeometry) -> bool {
        let Some(existing) = self.nodes.get_mut(&node) else {
            return false;
        };
        existing.props.left = geometry.left;
        existing.props.top = geometry.top;
        existing.props.width = geometry.width;
        existing.props.wrap_width = geometry.wrap_width;
        existing.props.height = geometry.height;
        existing.props.font_size = geometry.font_size;
        existing.scale_x = geometry.scale_x;
        existing.scale_y = geometry.scale_y;
        true
    }
}
