//! Render pipelines and the bind group layouts they share.
//!
//! Bind group 0 is always the per-frame group (camera, lights, shadow map),
//! except in the shadow pass where it holds the light-space matrix. Group 1
//! is the per-node model uniform and group 2 the node's material texture.

use crate::resources::ResourceManager;

pub mod basic;
pub mod lines;
pub mod transparent;

/// Per-frame uniform shared by every main pass pipeline.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// Inverse of projection times the rotation-only view, maps clip space to
    /// skybox directions.
    pub sky_inv: [[f32; 4]; 4],
    pub light_space: [[f32; 4]; 4],
    pub eye: [f32; 3],
    pub light_count: u32,
    pub shadows_enabled: u32,
    pub _padding: [u32; 3],
}

/// Light-space matrix for the shadow pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightSpaceUniform {
    pub matrix: [[f32; 4]; 4],
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_layout(
    device: &wgpu::Device,
    view_dimension: wgpu::TextureViewDimension,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
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
        label: Some(label),
    })
}

#[derive(Debug)]
pub struct Layouts {
    /// Frame uniform, lights, shadow depth texture and comparison sampler.
    pub frame: wgpu::BindGroupLayout,
    pub model: wgpu::BindGroupLayout,
    pub texture: wgpu::BindGroupLayout,
    pub cube: wgpu::BindGroupLayout,
    pub light_space: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("frame_bind_group_layout"),
        });
        let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            label: Some("model_bind_group_layout"),
        });
        let light_space = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            label: Some("light_space_bind_group_layout"),
        });
        Self {
            frame,
            model,
            texture: texture_layout(
                device,
                wgpu::TextureViewDimension::D2,
                "texture_bind_group_layout",
            ),
            cube: texture_layout(
                device,
                wgpu::TextureViewDimension::Cube,
                "cube_bind_group_layout",
            ),
            light_space,
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    pub lit: wgpu::RenderPipeline,
    pub depth: wgpu::RenderPipeline,
    pub skybox: wgpu::RenderPipeline,
    pub billboard: wgpu::RenderPipeline,
    pub particles: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
}

impl Pipelines {
    /// Build every pipeline from the built-in shaders served by `resources`.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        layouts: &Layouts,
        resources: &mut ResourceManager,
    ) -> anyhow::Result<Self> {
        let mut shader = |name: &str| -> anyhow::Result<String> {
            let path = format!("builtin/{name}.wgsl");
            Ok(resources.get_shader(&path, &path, None)?.source())
        };
        Ok(Self {
            lit: basic::mk_lit_pipeline(device, color_format, layouts, &shader("lit")?),
            depth: basic::mk_depth_pipeline(device, layouts, &shader("depth")?),
            skybox: basic::mk_skybox_pipeline(device, color_format, layouts, &shader("skybox")?),
            billboard: transparent::mk_billboard_pipeline(
                device,
                color_format,
                layouts,
                &shader("billboard")?,
            ),
            particles: transparent::mk_particles_pipeline(
                device,
                color_format,
                layouts,
                &shader("particles")?,
            ),
            lines: lines::mk_lines_pipeline(device, color_format, layouts, &shader("lines")?),
        })
    }
}
