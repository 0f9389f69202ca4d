use std::iter;
use std::time::Instant;

use bytemuck::cast_slice;
use glam::{Mat4, Vec3};
use wgpu::SurfaceError;

use orrery_scene::{FocusTarget, SUN_RADIUS, ViewState};

use super::ViewerState;
use super::mesh::{PlanetInstance, StarVertex, scene_uniforms};
use super::panels::PanelSlot;
use super::shaders::QUAD_INDICES;

const CAMERA_FOV_DEGREES: f32 = 75.0;
const CAMERA_NEAR: f32 = 0.1;
/// Far plane beyond the star cube's corners so no star pops at the edge.
const CAMERA_FAR: f32 = 4000.0;
/// Longest simulation step a frame may consume; gaps from stalls or resume
/// are swallowed instead of replayed.
const MAX_FRAME_STEP_SECS: f32 = 0.25;
const HOLDER_ROWS: usize = 12;
const STREAK_TAIL_LENGTH: f32 = 4.0;

const SUN_TINT: [f32; 4] = [1.0, 0.85, 0.55, 1.0];
const PLANET_TINT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const FOCUS_TINT: [f32; 4] = [1.45, 1.38, 1.15, 1.0];

/// Advances the simulation one frame step, rebuilds the dynamic buffers,
/// and encodes the scene pass plus one pass per visible HUD panel.
pub(super) fn render(state: &mut ViewerState) -> Result<(), SurfaceError> {
    advance_simulation(state);
    refresh_panel_text(state);

    let view_projection = camera_matrix(state);
    state.view_projection = view_projection;
    state.queue.write_buffer(
        &state.scene_uniform_buffer,
        0,
        cast_slice(&[scene_uniforms(view_projection)]),
    );

    let instances = build_body_instances(state);
    ensure_instance_capacity(state, instances.len());
    state
        .queue
        .write_buffer(&state.planet_instance_buffer, 0, cast_slice(&instances));

    let streaks = build_streak_vertices(state);
    ensure_streak_capacity(state, streaks.len());
    if !streaks.is_empty() {
        state
            .queue
            .write_buffer(&state.streak_vertex_buffer, 0, cast_slice(&streaks));
    }

    state.panels.upload_all(&state.queue);

    let frame = state.surface.get_current_texture()?;
    let surface_view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("orrery-frame-encoder"),
        });

    draw_space(
        state,
        &mut encoder,
        &surface_view,
        instances.len() as u32,
        streaks.len() as u32,
    );
    for slot in state.panels.iter() {
        draw_panel(state, &mut encoder, &surface_view, slot);
    }

    state.queue.submit(iter::once(encoder.finish()));
    frame.present();

    Ok(())
}

fn advance_simulation(state: &mut ViewerState) {
    let now = Instant::now();
    let dt = (now - state.last_frame).as_secs_f32().min(MAX_FRAME_STEP_SECS);
    state.last_frame = now;
    if state.paused {
        return;
    }
    state.universe.advance(dt);
    state.sky.advance(&mut state.sky_rng, dt);
}

/// Pushes fresh text into any panel whose lines changed since the last
/// frame; unchanged panels skip the CPU recomposition entirely.
pub(super) fn refresh_panel_text(state: &mut ViewerState) {
    let Some(font) = state.font.as_mut() else {
        return;
    };

    let status = state.universe.status_lines();
    if status != state.status_lines {
        if let Some(slot) = state.panels.status.as_mut() {
            slot.panel.set_lines(font, &status);
        }
        state.status_lines = status;
    }

    let holders = state.universe.holder_lines(HOLDER_ROWS);
    if holders != state.holder_lines {
        if let Some(slot) = state.panels.holders.as_mut() {
            slot.panel.set_lines(font, &holders);
        }
        state.holder_lines = holders;
    }

    let focus = state.universe.focus_lines();
    if focus != state.focus_lines {
        if let Some(slot) = state.panels.focus.as_mut() {
            slot.panel.set_lines(font, &focus);
        }
        state.focus_lines = focus;
    }
}

fn camera_matrix(state: &ViewerState) -> Mat4 {
    let (eye, target) = state.universe.camera_pose();
    let aspect = state.size.width.max(1) as f32 / state.size.height.max(1) as f32;
    let view = Mat4::look_at_rh(eye, target, Vec3::Y);
    let projection = Mat4::perspective_rh(
        CAMERA_FOV_DEGREES.to_radians(),
        aspect,
        CAMERA_NEAR,
        CAMERA_FAR,
    );
    projection * view
}

/// Instance zero is always the sun; holder planets follow in registry
/// order with the shared idle spin folded into each model matrix. The
/// settled focus target renders brightened so it reads as selected.
fn build_body_instances(state: &ViewerState) -> Vec<PlanetInstance> {
    let registry = state.universe.registry();
    let mut instances = Vec::with_capacity(registry.len() + 1);

    instances.push(PlanetInstance {
        model: Mat4::from_scale(Vec3::splat(SUN_RADIUS * 2.0)).to_cols_array_2d(),
        tint: SUN_TINT,
        texture_slot: 0,
        emissive: 1.0,
    });

    let spin = Mat4::from_rotation_y(state.universe.idle_spin());
    let focused_wallet = match state.universe.view_state() {
        ViewState::Focused(FocusTarget::Planet(wallet)) => Some(wallet.as_str()),
        _ => None,
    };

    for entity in registry.iter() {
        let model = spin
            * Mat4::from_translation(entity.position)
            * Mat4::from_scale(Vec3::splat(entity.size * 2.0));
        let tint = if focused_wallet == Some(entity.wallet_address.as_str()) {
            FOCUS_TINT
        } else {
            PLANET_TINT
        };
        instances.push(PlanetInstance {
            model: model.to_cols_array_2d(),
            tint,
            texture_slot: entity.texture_slot as u32,
            emissive: 0.0,
        });
    }

    instances
}

/// Each shooting star renders as one line segment: a bright head and a
/// tail trailing opposite the velocity, fading with age.
fn build_streak_vertices(state: &ViewerState) -> Vec<StarVertex> {
    let mut vertices = Vec::with_capacity(state.sky.active().len() * 2);
    for streak in state.sky.active() {
        let alpha = streak.alpha();
        let head = streak.position;
        let tail = head - streak.velocity.normalize_or_zero() * STREAK_TAIL_LENGTH;
        vertices.push(StarVertex {
            position: head.to_array(),
            intensity: alpha,
        });
        vertices.push(StarVertex {
            position: tail.to_array(),
            intensity: alpha * 0.15,
        });
    }
    vertices
}

fn ensure_instance_capacity(state: &mut ViewerState, required: usize) {
    if required <= state.planet_instance_capacity {
        return;
    }
    let mut capacity = state.planet_instance_capacity.max(1);
    while capacity < required {
        capacity *= 2;
    }
    state.planet_instance_buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("planet-instance-buffer"),
        size: (capacity * std::mem::size_of::<PlanetInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    state.planet_instance_capacity = capacity;
}

fn ensure_streak_capacity(state: &mut ViewerState, required: usize) {
    if required <= state.streak_capacity {
        return;
    }
    let mut capacity = state.streak_capacity.max(1);
    while capacity < required {
        capacity *= 2;
    }
    state.streak_vertex_buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("streak-vertex-buffer"),
        size: (capacity * std::mem::size_of::<StarVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    state.streak_capacity = capacity;
}

/// One pass clears color and depth, then draws bodies, the star field, and
/// any shooting-star streaks. Bodies write depth; the sky only tests it.
fn draw_space(
    state: &ViewerState,
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    instance_count: u32,
    streak_vertex_count: u32,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("space-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(state.background),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &state.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    pass.set_bind_group(0, &state.scene_bind_group, &[]);

    pass.set_pipeline(&state.planet_pipeline);
    pass.set_bind_group(1, &state.pool_bind_group, &[]);
    pass.set_vertex_buffer(0, state.planet_vertex_buffer.slice(..));
    let instance_bytes = instance_count as u64 * std::mem::size_of::<PlanetInstance>() as u64;
    pass.set_vertex_buffer(1, state.planet_instance_buffer.slice(0..instance_bytes));
    pass.set_index_buffer(state.planet_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    pass.draw_indexed(0..state.planet_index_count, 0, 0..instance_count);

    pass.set_pipeline(&state.star_pipeline);
    pass.set_vertex_buffer(0, state.star_vertex_buffer.slice(..));
    pass.draw(0..state.star_count, 0..1);

    if streak_vertex_count > 0 {
        let streak_bytes = streak_vertex_count as u64 * std::mem::size_of::<StarVertex>() as u64;
        pass.set_pipeline(&state.streak_pipeline);
        pass.set_vertex_buffer(0, state.streak_vertex_buffer.slice(0..streak_bytes));
        pass.draw(0..streak_vertex_count, 0..1);
    }
}

fn draw_panel(
    state: &ViewerState,
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    slot: &PanelSlot,
) {
    if !slot.panel.is_visible() {
        return;
    }

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("panel-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    pass.set_pipeline(&state.panel_pipeline);
    pass.set_bind_group(0, slot.panel.bind_group(), &[]);
    pass.set_vertex_buffer(0, slot.quad_buffer.slice(..));
    pass.set_index_buffer(state.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
    pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
}
