use crate::{
    data_structures::{mesh::Vertex, particles::ParticleInstance},
    pipelines::basic::{depth_state, mk_render_pipeline, primitive},
};

/**
 * Billboards are generated in the vertex shader from the node's centre and
 * size, so the pipeline takes no vertex buffers.
 *
 * Alpha blended surfaces test against depth but do not write it, otherwise
 * overlapping quads would cut each other out depending on draw order.
 */
pub fn mk_billboard_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &super::Layouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Billboard Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.frame), Some(&layouts.model), Some(&layouts.texture)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Billboard Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(depth_state(false, wgpu::CompareFunction::Less)),
        primitive(wgpu::PrimitiveTopology::TriangleList, None),
        &[],
        shader,
    )
}

/// One instanced quad per live particle.
pub fn mk_particles_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &super::Layouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Particles Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.frame), Some(&layouts.model), Some(&layouts.texture)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Particles Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(depth_state(false, wgpu::CompareFunction::Less)),
        primitive(wgpu::PrimitiveTopology::TriangleList, None),
        &[ParticleInstance::desc()],
        shader,
    )
}
