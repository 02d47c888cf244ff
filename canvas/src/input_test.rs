#![allow(clippy::clone_on_copy)]

use super::*;

fn id(s: &str) -> BlockId {
    s.to_owned()
}

// =============================================================
// InputState
// =============================================================

#[test]
fn default_state_is_idle() {
    let state = InputState::default();
    assert_eq!(state, InputState::Idle);
    assert!(state.selected_id().is_none());
    assert!(!state.in_gesture());
}

#[test]
fn selected_id_for_every_active_state() {
    let start = Point::new(1.0, 2.0);
    let states = [
        InputState::Selected { id: id("a") },
        InputState::Dragging { id: id("a"), start },
        InputState::Resizing { id: id("a"), start, policy: ResizePolicy::Free },
    ];
    for state in states {
        assert_eq!(state.selected_id().map(String::as_str), Some("a"));
    }
}

#[test]
fn in_gesture_only_for_drag_and_resize() {
    let start = Point::new(0.0, 0.0);
    assert!(!InputState::Selected { id: id("a") }.in_gesture());
    assert!(InputState::Dragging { id: id("a"), start }.in_gesture());
    assert!(InputState::Resizing { id: id("a"), start, policy: ResizePolicy::FixedWidthAutogrow }.in_gesture());
}

#[test]
fn gesture_start_reports_origin() {
    let start = Point::new(5.0, 6.0);
    assert_eq!(InputState::Dragging { id: id("a"), start }.gesture_start(), Some(start));
    assert!(InputState::Selected { id: id("a") }.gesture_start().is_none());
}

// =============================================================
// Small types
// =============================================================

#[test]
fn key_name_match() {
    let key = Key("Escape".to_owned());
    assert!(key.is("Escape"));
    assert!(!key.is("Enter"));
}

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift && !m.ctrl && !m.alt && !m.meta);
}

#[test]
fn ui_state_default_not_editing() {
    let ui = UiState::default();
    assert!(ui.editing_id.is_none());
    assert_eq!(ui.cursor, "");
}

#[test]
fn gesture_event_equality() {
    let a = GestureEvent::MoveDelta { dx: 1.0, dy: 2.0 };
    assert_eq!(a.clone(), GestureEvent::MoveDelta { dx: 1.0, dy: 2.0 });
    assert_ne!(a, GestureEvent::ResizeDelta { dx: 1.0, dy: 2.0 });
}
