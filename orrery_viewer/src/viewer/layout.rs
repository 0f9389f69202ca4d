use bytemuck::cast_slice;
use winit::dpi::PhysicalSize;

use super::shaders::QuadVertex;
use super::{ViewerState, init};
use crate::overlay::PanelAnchor;

const PANEL_MARGIN_PX: f32 = 12.0;

pub(super) fn resize(state: &mut ViewerState, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    state.depth_view = init::create_depth_view(&state.device, new_size);
    apply_panel_layouts(state);
}

/// Re-anchors every panel quad to its window corner. Panel textures keep
/// their pixel size; only the NDC rectangle moves.
pub(super) fn apply_panel_layouts(state: &mut ViewerState) {
    let window = state.size;
    for slot in state.panels.iter() {
        let (width, height) = slot.panel.size();
        let (x, y) = anchor_origin(slot.panel.anchor(), window, width, height);
        let vertices = quad_for_rect(window, x, y, width as f32, height as f32);
        state
            .queue
            .write_buffer(&slot.quad_buffer, 0, cast_slice(&vertices));
    }
}

fn anchor_origin(
    anchor: PanelAnchor,
    window: PhysicalSize<u32>,
    width: u32,
    height: u32,
) -> (f32, f32) {
    let window_w = window.width.max(1) as f32;
    let window_h = window.height.max(1) as f32;
    match anchor {
        PanelAnchor::TopLeft => (PANEL_MARGIN_PX, PANEL_MARGIN_PX),
        PanelAnchor::TopRight => (
            (window_w - width as f32 - PANEL_MARGIN_PX).max(0.0),
            PANEL_MARGIN_PX,
        ),
        PanelAnchor::BottomLeft => (
            PANEL_MARGIN_PX,
            (window_h - height as f32 - PANEL_MARGIN_PX).max(0.0),
        ),
    }
}

/// Pixel rectangle to NDC corners, in the vertex order top-left,
/// bottom-left, top-right, bottom-right expected by `QUAD_INDICES`.
fn quad_for_rect(
    window: PhysicalSize<u32>,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> [QuadVertex; 4] {
    let window_w = window.width.max(1) as f32;
    let window_h = window.height.max(1) as f32;
    let left = x / window_w * 2.0 - 1.0;
    let right = (x + width) / window_w * 2.0 - 1.0;
    let top = 1.0 - y / window_h * 2.0;
    let bottom = 1.0 - (y + height) / window_h * 2.0;
    [
        QuadVertex {
            position: [left, top],
            tex_coords: [0.0, 0.0],
        },
        QuadVertex {
            position: [left, bottom],
            tex_coords: [0.0, 1.0],
        },
        QuadVertex {
            position: [right, top],
            tex_coords: [1.0, 0.0],
        },
        QuadVertex {
            position: [right, bottom],
            tex_coords: [1.0, 1.0],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_window_rect_maps_to_clip_corners() {
        let window = PhysicalSize::new(800, 600);
        let quad = quad_for_rect(window, 0.0, 0.0, 800.0, 600.0);
        assert_eq!(quad[0].position, [-1.0, 1.0]);
        assert_eq!(quad[1].position, [-1.0, -1.0]);
        assert_eq!(quad[2].position, [1.0, 1.0]);
        assert_eq!(quad[3].position, [1.0, -1.0]);
    }

    #[test]
    fn anchors_keep_the_margin() {
        let window = PhysicalSize::new(1280, 720);
        assert_eq!(
            anchor_origin(PanelAnchor::TopLeft, window, 400, 100),
            (12.0, 12.0)
        );
        assert_eq!(
            anchor_origin(PanelAnchor::TopRight, window, 400, 100),
            (1280.0 - 400.0 - 12.0, 12.0)
        );
        assert_eq!(
            anchor_origin(PanelAnchor::BottomLeft, window, 400, 100),
            (12.0, 720.0 - 100.0 - 12.0)
        );
    }

    #[test]
    fn oversized_panel_clamps_to_the_window_edge() {
        let window = PhysicalSize::new(300, 200);
        let (x, y) = anchor_origin(PanelAnchor::TopRight, window, 400, 100);
        assert_eq!((x, y), (0.0, 12.0));
        let (x, y) = anchor_origin(PanelAnchor::BottomLeft, window, 200, 400);
        assert_eq!((x, y), (12.0, 0.0));
    }
}
