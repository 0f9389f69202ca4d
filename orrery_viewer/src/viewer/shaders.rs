use bytemuck::{Pod, Zeroable};

/// Instanced body shader. The model matrix arrives as four vec4 attributes,
/// albedo comes from the planet texture array, and lighting is a headlight
/// anchored at the origin sun.
pub(super) const PLANET_SHADER_SOURCE: &str = r#"
struct SceneUniforms {
    view_projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniforms;

@group(1) @binding(0)
var planet_array: texture_2d_array<f32>;
@group(1) @binding(1)
var planet_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) tint: vec4<f32>,
    @location(8) texture_slot: u32,
    @location(9) emissive: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tint: vec4<f32>,
    @location(4) @interpolate(flat) texture_slot: u32,
    @location(5) emissive: f32,
};

@vertex
fn planet_vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = scene.view_projection * world;
    out.world_position = world.xyz;
    out.world_normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.uv;
    out.tint = instance.tint;
    out.texture_slot = instance.texture_slot;
    out.emissive = instance.emissive;
    return out;
}

@fragment
fn planet_fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(planet_array, planet_sampler, in.uv, in.texture_slot);
    let to_sun = normalize(-in.world_position);
    let lit = 0.25 + 0.75 * max(dot(in.world_normal, to_sun), 0.0);
    let surface = albedo.rgb * lit * in.tint.rgb;
    let color = mix(surface, in.tint.rgb, in.emissive);
    return vec4<f32>(color, 1.0);
}
"#;

/// Shared by the star point cloud and the shooting-star line segments; the
/// per-vertex intensity drives alpha so streak tails fade out.
pub(super) const SKY_SHADER_SOURCE: &str = r#"
struct SceneUniforms {
    view_projection: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: SceneUniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) intensity: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) intensity: f32,
};

@vertex
fn sky_vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = scene.view_projection * vec4<f32>(vertex.position, 1.0);
    out.intensity = vertex.intensity;
    return out;
}

@fragment
fn sky_fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(0.9, 0.93, 1.0, in.intensity);
}
"#;

/// Screen-space textured quad for the HUD panels.
pub(super) const PANEL_SHADER_SOURCE: &str = r#"
@group(0) @binding(0)
var panel_texture: texture_2d<f32>;
@group(0) @binding(1)
var panel_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) tex_coords: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
};

@vertex
fn panel_vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(vertex.position, 0.0, 1.0);
    out.tex_coords = vertex.tex_coords;
    return out;
}

@fragment
fn panel_fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(panel_texture, panel_sampler, in.tex_coords);
}
"#;

/// One corner of a HUD panel quad in NDC, with its texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub(super) position: [f32; 2],
    pub(super) tex_coords: [f32; 2],
}

/// Two triangles over the vertex order top-left, bottom-left, top-right,
/// bottom-right.
pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];
