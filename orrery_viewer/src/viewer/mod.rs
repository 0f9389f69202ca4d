//! Windowed presentation of the holder universe.
//!
//! [`ViewerState`] owns the GPU surface, the scene buffers, and the
//! simulation objects. Its lifecycle is split across focused slices: `init`
//! bootstraps wgpu and uploads the static resources, `layout` reacts to
//! window geometry, `input` maps pointer and key events onto camera and
//! focus commands, and `render` advances the simulation and encodes a frame.

mod init;
mod input;
mod layout;
mod mesh;
mod panels;
mod render;
mod shaders;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use glam::Mat4;
use rand::rngs::StdRng;
use wgpu::SurfaceError;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta},
    window::Window,
};

use crate::cli::LayoutPreset;
use crate::overlay::OverlayFont;
use crate::starfield::ShootingStarField;
use crate::texture::TexturePool;
use crate::universe::UniverseScene;
use panels::OverlayPanels;

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    planet_pipeline: wgpu::RenderPipeline,
    planet_vertex_buffer: wgpu::Buffer,
    planet_index_buffer: wgpu::Buffer,
    planet_index_count: u32,
    planet_instance_buffer: wgpu::Buffer,
    planet_instance_capacity: usize,
    scene_uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    pool_bind_group: wgpu::BindGroup,
    _pool_texture: wgpu::Texture,

    star_pipeline: wgpu::RenderPipeline,
    star_vertex_buffer: wgpu::Buffer,
    star_count: u32,
    streak_pipeline: wgpu::RenderPipeline,
    streak_vertex_buffer: wgpu::Buffer,
    streak_capacity: usize,

    depth_view: wgpu::TextureView,

    panel_pipeline: wgpu::RenderPipeline,
    quad_index_buffer: wgpu::Buffer,
    panels: OverlayPanels,
    font: Option<OverlayFont>,
    status_lines: Vec<String>,
    holder_lines: Vec<String>,
    focus_lines: Vec<String>,

    universe: UniverseScene,
    sky: ShootingStarField,
    sky_rng: StdRng,
    background: wgpu::Color,

    last_frame: Instant,
    paused: bool,
    view_projection: Mat4,
    cursor_position: Option<PhysicalPosition<f64>>,
    dragging: bool,
    drag_travel: f32,
}

impl ViewerState {
    pub async fn new(
        window: Arc<Window>,
        pool: &TexturePool,
        font: Option<OverlayFont>,
        universe: UniverseScene,
        layout_preset: LayoutPreset,
        sky_seed: Option<u64>,
    ) -> Result<Self> {
        init::new(window, pool, font, universe, layout_preset, sky_seed).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn universe(&self) -> &UniverseScene {
        &self.universe
    }

    pub fn universe_mut(&mut self) -> &mut UniverseScene {
        &mut self.universe
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Halts scene time while the window is occluded. The frame clock
    /// restarts on resume so the hidden interval never replays.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if !paused {
            self.last_frame = Instant::now();
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        layout::resize(self, new_size);
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        render::render(self)
    }

    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        input::handle_key_event(self, event);
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        input::handle_mouse_button(self, button, state);
    }

    pub fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        input::handle_cursor_moved(self, position);
    }

    pub fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        input::handle_mouse_wheel(self, delta);
    }
}
