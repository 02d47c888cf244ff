//! Hit-testing: which block (and which part of it) lies under a canvas point.
//!
//! Only text blocks are targets; the background is never hit. The resize
//! handle belongs to the selected block alone and is checked before any body,
//! so a handle overhanging a neighbour still wins.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::{BlockId, BlockStore, ResizePolicy};
use crate::geom::{Point, Rect};

/// Which part of a block was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub block_id: BlockId,
    pub part: HitPart,
}

/// Center of the resize handle for a block occupying `rect`.
///
/// `Free` blocks resize from the bottom-right corner; `FixedWidthAutogrow`
/// blocks only from the middle of the right edge.
#[must_use]
pub fn handle_position(rect: Rect, policy: ResizePolicy) -> Point {
    match policy {
        ResizePolicy::Free => rect.bottom_right(),
        ResizePolicy::FixedWidthAutogrow => Point::new(rect.x + rect.width, rect.y + rect.height / 2.0),
    }
}

/// Whether `pt` is within the handle's square slop around `center`.
#[must_use]
pub fn near_handle(pt: Point, center: Point) -> bool {
    (pt.x - center.x).abs() <= HANDLE_RADIUS_PX && (pt.y - center.y).abs() <= HANDLE_RADIUS_PX
}

/// Test which block (if any) is under `pt`, checking the selected block's
/// handle first.
///
/// When bodies overlap, the smallest block wins so a small block stacked on a
/// large one stays reachable; ties go to the lower id.
#[must_use]
pub fn hit_test(pt: Point, doc: &BlockStore, selected: Option<&str>) -> Option<Hit> {
    if let Some(block) = selected.and_then(|id| doc.get(id)) {
        if near_handle(pt, handle_position(block.rect(), block.resize_policy)) {
            return Some(Hit { block_id: block.id.clone(), part: HitPart::ResizeHandle });
        }
    }

    doc.sorted_blocks()
        .into_iter()
        .filter(|b| b.rect().contains(pt))
        .min_by(|a, b| a.rect().area().total_cmp(&b.rect().area()).then_with(|| a.id.cmp(&b.id)))
        .map(|b| Hit { block_id: b.id.clone(), part: HitPart::Body })
}
