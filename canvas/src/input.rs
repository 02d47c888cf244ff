//! Input model: modifier keys, mouse buttons, gesture events, and the
//! interaction state machine.
//!
//! Pointer handlers in [`crate::engine::EngineCore`] translate raw pointer
//! positions into [`GestureEvent`]s; the state machine consumes only those
//! events, so hosts that already recognise gestures can feed them directly.
//! `InputState` records which block is selected and which gesture, if any, is
//! being tracked between pointer-down and pointer-up.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::{BlockId, ResizePolicy};
use crate::geom::Point;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

/// One phase of a direct-manipulation gesture.
///
/// Deltas are cumulative from the start point, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    MoveStart { id: BlockId, at: Point },
    MoveDelta { dx: f64, dy: f64 },
    ResizeStart { id: BlockId, at: Point },
    ResizeDelta { dx: f64, dy: f64 },
    GestureEnd,
}

/// Persistent UI state outside the gesture machine.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Block whose text is being edited, if any. Always the selected block.
    pub editing_id: Option<BlockId>,
    /// Last cursor reported to the host.
    pub cursor: &'static str,
}

/// Interaction state.
///
/// Every state except `Idle` carries the selected block.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputState {
    /// Nothing selected.
    #[default]
    Idle,
    /// A block is selected and no gesture is running.
    Selected { id: BlockId },
    /// The selected block is being moved.
    Dragging {
        id: BlockId,
        /// Canvas point where the drag started.
        start: Point,
    },
    /// The selected block is being resized from its handle.
    Resizing {
        id: BlockId,
        /// Canvas point where the resize started.
        start: Point,
        /// Policy of the block when the resize began.
        policy: ResizePolicy,
    },
}

impl InputState {
    /// The selected block, if any.
    #[must_use]
    pub fn selected_id(&self) -> Option<&BlockId> {
        match self {
            Self::Idle => None,
            Self::Selected { id } | Self::Dragging { id, .. } | Self::Resizing { id, .. } => Some(id),
        }
    }

    /// Whether a move or resize is being tracked.
    #[must_use]
    pub fn in_gesture(&self) -> bool {
        matches!(self, Self::Dragging { .. } | Self::Resizing { .. })
    }

    /// Canvas point where the active gesture started.
    #[must_use]
    pub fn gesture_start(&self) -> Option<Point> {
        match self {
            Self::Dragging { start, .. } | Self::Resizing { start, .. } => Some(*start),
            Self::Idle | Self::Selected { .. } => None,
        }
    }
}
