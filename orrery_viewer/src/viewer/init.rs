use std::{borrow::Cow, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use glam::Mat4;
use rand::{SeedableRng, rngs::StdRng};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use super::mesh::{
    PlanetInstance, PlanetVertex, SPHERE_LAT_STEPS, SPHERE_LON_STEPS, SceneUniforms, StarVertex,
    build_planet_sphere, scene_uniforms,
};
use super::panels::{OverlayPanels, PanelSlot};
use super::shaders::{
    PANEL_SHADER_SOURCE, PLANET_SHADER_SOURCE, QUAD_INDICES, QuadVertex, SKY_SHADER_SOURCE,
};
use super::{ViewerState, layout, render};
use crate::cli::{LayoutPreset, PanelPreset};
use crate::overlay::{OverlayFont, PanelAnchor, TextPanel, TextPanelConfig};
use crate::starfield::{ShootingStarField, scatter_stars};
use crate::texture::{POOL_LAYER_SIZE, TexturePool, prepare_rgba_upload};
use crate::universe::UniverseScene;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const SPACE_BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.004,
    g: 0.006,
    b: 0.012,
    a: 1.0,
};

const INITIAL_INSTANCE_CAPACITY: usize = 64;
const INITIAL_STREAK_VERTEX_CAPACITY: usize = 64;

/// Stars and streaks only add light; overlapping sky never darkens.
const SKY_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

const STATUS_PANEL: TextPanelConfig = TextPanelConfig {
    width: 440,
    height: 136,
    padding_x: 10,
    padding_y: 8,
    anchor: PanelAnchor::TopLeft,
    label: "status-panel",
};

const HOLDERS_PANEL: TextPanelConfig = TextPanelConfig {
    width: 400,
    height: 320,
    padding_x: 10,
    padding_y: 8,
    anchor: PanelAnchor::TopRight,
    label: "holders-panel",
};

const FOCUS_PANEL: TextPanelConfig = TextPanelConfig {
    width: 440,
    height: 112,
    padding_x: 10,
    padding_y: 8,
    anchor: PanelAnchor::BottomLeft,
    label: "focus-panel",
};

/// Bundles the wgpu objects tied to the viewer window.
struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

/// Shared camera uniform and its bind group (group 0 of the scene pass).
struct SceneBinding {
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

/// The planet texture array and its bind group (group 1 of the body pass).
struct PoolBinding {
    texture: wgpu::Texture,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

/// Pipeline and geometry for the instanced sun/planet spheres.
struct BodyResources {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

/// Static star points plus the dynamic shooting-star segment buffer.
struct SkyResources {
    star_pipeline: wgpu::RenderPipeline,
    star_vertex_buffer: wgpu::Buffer,
    star_count: u32,
    streak_pipeline: wgpu::RenderPipeline,
    streak_vertex_buffer: wgpu::Buffer,
    streak_capacity: usize,
}

/// Pipeline and shared index buffer for the HUD quads.
struct PanelResources {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    quad_index_buffer: wgpu::Buffer,
}

/// Bootstraps wgpu, uploads the sphere mesh, the planet texture array, and
/// the star field, and builds the HUD panels, handing back a ready-to-render
/// [`ViewerState`]. Everything allocated here is sized so per-frame work is
/// buffer writes only.
pub(super) async fn new(
    window: Arc<Window>,
    pool: &TexturePool,
    font: Option<OverlayFont>,
    universe: UniverseScene,
    layout_preset: LayoutPreset,
    sky_seed: Option<u64>,
) -> Result<ViewerState> {
    let size = window.inner_size();

    let wgpu = bootstrap_wgpu(window.clone()).await?;
    let scene = create_scene_binding(&wgpu.device);
    let pool_binding = create_pool_binding(&wgpu.device, &wgpu.queue, pool)?;
    let bodies = create_body_resources(
        &wgpu.device,
        wgpu.surface_format,
        &scene.bind_group_layout,
        &pool_binding.bind_group_layout,
    );

    let mut sky_rng = match sky_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let stars = scatter_stars(&mut sky_rng);
    let sky_field = ShootingStarField::new(&mut sky_rng);
    let sky = create_sky_resources(
        &wgpu.device,
        wgpu.surface_format,
        &scene.bind_group_layout,
        &stars
            .iter()
            .map(|star| StarVertex {
                position: star.position.to_array(),
                intensity: star.brightness,
            })
            .collect::<Vec<_>>(),
    );

    let panel_resources = create_panel_resources(&wgpu.device, wgpu.surface_format);
    // Without a font there is no text to rasterize, so no panels either.
    let panels = if font.is_some() {
        build_panels(
            &wgpu.device,
            &wgpu.queue,
            &panel_resources.bind_group_layout,
            &layout_preset,
        )
    } else {
        OverlayPanels {
            status: None,
            holders: None,
            focus: None,
        }
    };

    let depth_view = create_depth_view(&wgpu.device, size);

    let mut state = ViewerState {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config: wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu.surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu.present_mode,
            alpha_mode: wgpu.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        },
        size,
        planet_pipeline: bodies.pipeline,
        planet_vertex_buffer: bodies.vertex_buffer,
        planet_index_buffer: bodies.index_buffer,
        planet_index_count: bodies.index_count,
        planet_instance_buffer: bodies.instance_buffer,
        planet_instance_capacity: bodies.instance_capacity,
        scene_uniform_buffer: scene.uniform_buffer,
        scene_bind_group: scene.bind_group,
        pool_bind_group: pool_binding.bind_group,
        _pool_texture: pool_binding.texture,
        star_pipeline: sky.star_pipeline,
        star_vertex_buffer: sky.star_vertex_buffer,
        star_count: sky.star_count,
        streak_pipeline: sky.streak_pipeline,
        streak_vertex_buffer: sky.streak_vertex_buffer,
        streak_capacity: sky.streak_capacity,
        depth_view,
        panel_pipeline: panel_resources.pipeline,
        quad_index_buffer: panel_resources.quad_index_buffer,
        panels,
        font,
        status_lines: Vec::new(),
        holder_lines: Vec::new(),
        focus_lines: Vec::new(),
        universe,
        sky: sky_field,
        sky_rng,
        background: SPACE_BACKGROUND,
        last_frame: Instant::now(),
        paused: false,
        view_projection: Mat4::IDENTITY,
        cursor_position: None,
        dragging: false,
        drag_travel: 0.0,
    };

    state.surface.configure(&state.device, &state.config);
    layout::apply_panel_layouts(&mut state);
    render::refresh_panel_text(&mut state);

    Ok(state)
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("orrery-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .unwrap_or(surface_caps.formats[0]);
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

fn create_scene_binding(device: &wgpu::Device) -> SceneBinding {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene-uniform-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<SceneUniforms>() as u64
                ),
            },
            count: None,
        }],
    });

    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("scene-uniform-buffer"),
        contents: cast_slice(&[scene_uniforms(Mat4::IDENTITY)]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene-uniform-bind-group"),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    SceneBinding {
        uniform_buffer,
        bind_group_layout,
        bind_group,
    }
}

/// Uploads every pool slot into one texture array layer, fallback swatches
/// included, so instance `texture_slot` values index it directly.
fn create_pool_binding(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pool: &TexturePool,
) -> Result<PoolBinding> {
    let layers = pool.slots.len().max(1) as u32;
    let extent = wgpu::Extent3d {
        width: POOL_LAYER_SIZE,
        height: POOL_LAYER_SIZE,
        depth_or_array_layers: layers,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("planet-pool-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (slot_index, slot) in pool.slots.iter().enumerate() {
        let upload = prepare_rgba_upload(POOL_LAYER_SIZE, POOL_LAYER_SIZE, &slot.data)
            .with_context(|| format!("uploading planet texture slot {slot_index}"))?;
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: slot_index as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(POOL_LAYER_SIZE),
            },
            wgpu::Extent3d {
                width: POOL_LAYER_SIZE,
                height: POOL_LAYER_SIZE,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    });
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("planet-pool-sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("planet-pool-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("planet-pool-bind-group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    Ok(PoolBinding {
        texture,
        bind_group_layout,
        bind_group,
    })
}

fn create_body_resources(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    scene_layout: &wgpu::BindGroupLayout,
    pool_layout: &wgpu::BindGroupLayout,
) -> BodyResources {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("planet-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(PLANET_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("planet-pipeline-layout"),
        bind_group_layouts: &[scene_layout, pool_layout],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PlanetVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };

    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<PlanetInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 64,
                shader_location: 7,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 80,
                shader_location: 8,
                format: wgpu::VertexFormat::Uint32,
            },
            wgpu::VertexAttribute {
                offset: 84,
                shader_location: 9,
                format: wgpu::VertexFormat::Float32,
            },
        ],
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("planet-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "planet_vs_main",
            buffers: &[vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "planet_fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: Some(wgpu::Face::Back),
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let sphere = build_planet_sphere(SPHERE_LAT_STEPS, SPHERE_LON_STEPS);
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("planet-sphere-vertex-buffer"),
        contents: cast_slice(&sphere.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("planet-sphere-index-buffer"),
        contents: cast_slice(&sphere.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("planet-instance-buffer"),
        size: (INITIAL_INSTANCE_CAPACITY * std::mem::size_of::<PlanetInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    BodyResources {
        pipeline,
        vertex_buffer,
        index_buffer,
        index_count: sphere.indices.len() as u32,
        instance_buffer,
        instance_capacity: INITIAL_INSTANCE_CAPACITY,
    }
}

fn create_sky_resources(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    scene_layout: &wgpu::BindGroupLayout,
    star_vertices: &[StarVertex],
) -> SkyResources {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sky-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SKY_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("sky-pipeline-layout"),
        bind_group_layouts: &[scene_layout],
        push_constant_ranges: &[],
    });

    let star_pipeline = create_sky_pipeline(
        device,
        &pipeline_layout,
        &shader,
        surface_format,
        wgpu::PrimitiveTopology::PointList,
        "star-pipeline",
    );
    let streak_pipeline = create_sky_pipeline(
        device,
        &pipeline_layout,
        &shader,
        surface_format,
        wgpu::PrimitiveTopology::LineList,
        "streak-pipeline",
    );

    let star_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("star-vertex-buffer"),
        contents: cast_slice(star_vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let streak_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("streak-vertex-buffer"),
        size: (INITIAL_STREAK_VERTEX_CAPACITY * std::mem::size_of::<StarVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    SkyResources {
        star_pipeline,
        star_vertex_buffer,
        star_count: star_vertices.len() as u32,
        streak_pipeline,
        streak_vertex_buffer,
        streak_capacity: INITIAL_STREAK_VERTEX_CAPACITY,
    }
}

/// The star and streak pipelines differ only in primitive topology. Both
/// test against the planet depth buffer without writing it, so bodies
/// occlude the sky while streaks never occlude each other.
fn create_sky_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    surface_format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    label: &'static str,
) -> wgpu::RenderPipeline {
    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<StarVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "sky_vs_main",
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "sky_fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(SKY_BLEND),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_panel_resources(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
) -> PanelResources {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("panel-bind-group-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("panel-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(PANEL_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("panel-pipeline-layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let quad_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("panel-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "panel_vs_main",
            buffers: &[quad_vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "panel_fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("panel-quad-index-buffer"),
        contents: cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    PanelResources {
        pipeline,
        bind_group_layout,
        quad_index_buffer,
    }
}

fn build_panels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bind_group_layout: &wgpu::BindGroupLayout,
    preset: &LayoutPreset,
) -> OverlayPanels {
    OverlayPanels {
        status: build_panel(
            device,
            queue,
            bind_group_layout,
            STATUS_PANEL,
            preset.status.as_ref(),
        ),
        holders: build_panel(
            device,
            queue,
            bind_group_layout,
            HOLDERS_PANEL,
            preset.holders.as_ref(),
        ),
        focus: build_panel(
            device,
            queue,
            bind_group_layout,
            FOCUS_PANEL,
            preset.focus.as_ref(),
        ),
    }
}

fn build_panel(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bind_group_layout: &wgpu::BindGroupLayout,
    base: TextPanelConfig,
    preset: Option<&PanelPreset>,
) -> Option<PanelSlot> {
    if !preset.map(PanelPreset::enabled).unwrap_or(true) {
        return None;
    }

    let config = merge_panel_config(base, preset);
    let quad_label = format!("{}-quad-buffer", config.label);
    let quad_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&quad_label),
        size: (4 * std::mem::size_of::<QuadVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let panel = TextPanel::new(device, queue, bind_group_layout, config);

    Some(PanelSlot { panel, quad_buffer })
}

fn merge_panel_config(base: TextPanelConfig, preset: Option<&PanelPreset>) -> TextPanelConfig {
    let Some(preset) = preset else {
        return base;
    };
    TextPanelConfig {
        width: preset.width.unwrap_or(base.width),
        height: preset.height.unwrap_or(base.height),
        padding_x: preset.padding_x.unwrap_or(base.padding_x),
        padding_y: preset.padding_y.unwrap_or(base.padding_y),
        ..base
    }
}

pub(super) fn create_depth_view(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene-depth-texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
