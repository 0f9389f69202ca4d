use glam::Vec2;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta},
    keyboard::{Key, NamedKey},
};

use super::ViewerState;

/// Pointer travel below this many pixels still counts as a click.
const CLICK_SLOP_PX: f32 = 4.0;
const ORBIT_RADIANS_PER_PIXEL: f32 = 0.005;
/// Trackpads report pixel deltas; this many pixels equal one wheel line.
const PIXELS_PER_SCROLL_LINE: f64 = 120.0;

pub(super) fn handle_key_event(state: &mut ViewerState, event: &KeyEvent) {
    if event.state != ElementState::Pressed {
        return;
    }
    match event.logical_key.as_ref() {
        Key::Named(NamedKey::Tab) | Key::Named(NamedKey::ArrowRight) => {
            state.universe.cycle_focus(1)
        }
        Key::Named(NamedKey::ArrowLeft) => state.universe.cycle_focus(-1),
        Key::Named(NamedKey::Escape) | Key::Named(NamedKey::Backspace) => {
            state.universe.return_to_overview()
        }
        Key::Character("s") | Key::Character("S") => state.universe.focus_sun(),
        _ => {}
    }
}

/// Left button presses start a drag; a release that barely moved is a pick
/// instead, resolved against the matrix the last frame rendered with.
pub(super) fn handle_mouse_button(
    state: &mut ViewerState,
    button: MouseButton,
    element_state: ElementState,
) {
    if button != MouseButton::Left {
        return;
    }
    match element_state {
        ElementState::Pressed => {
            state.dragging = true;
            state.drag_travel = 0.0;
        }
        ElementState::Released => {
            let was_click = state.dragging && state.drag_travel < CLICK_SLOP_PX;
            state.dragging = false;
            if !was_click {
                return;
            }
            let Some(position) = state.cursor_position else {
                return;
            };
            let ndc = cursor_to_ndc(position, state.size);
            state.universe.handle_click(ndc, state.view_projection);
        }
    }
}

pub(super) fn handle_cursor_moved(state: &mut ViewerState, position: PhysicalPosition<f64>) {
    if state.dragging {
        if let Some(previous) = state.cursor_position {
            let dx = (position.x - previous.x) as f32;
            let dy = (position.y - previous.y) as f32;
            state.drag_travel += dx.hypot(dy);
            state
                .universe
                .orbit_input(dx * ORBIT_RADIANS_PER_PIXEL, dy * ORBIT_RADIANS_PER_PIXEL);
        }
    }
    state.cursor_position = Some(position);
}

pub(super) fn handle_mouse_wheel(state: &mut ViewerState, delta: MouseScrollDelta) {
    let steps = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_SCROLL_LINE) as f32,
    };
    if steps != 0.0 {
        state.universe.zoom_input(steps);
    }
}

fn cursor_to_ndc(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> Vec2 {
    let width = size.width.max(1) as f64;
    let height = size.height.max(1) as f64;
    Vec2::new(
        ((position.x / width) * 2.0 - 1.0) as f32,
        (1.0 - (position.y / height) * 2.0) as f32,
    )
}
