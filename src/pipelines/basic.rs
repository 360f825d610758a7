use crate::data_structures::{
    mesh::{MeshVertex, Vertex},
    texture::Texture,
};

pub fn mk_lit_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &super::Layouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lit Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.frame), Some(&layouts.model), Some(&layouts.texture)],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Lit Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        Some(color_format),
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(depth_state(true, wgpu::CompareFunction::Less)),
        primitive(wgpu::PrimitiveTopology::TriangleList, Some(wgpu::Face::Back)),
        &[MeshVertex::desc()],
        shader,
    )
}

/**
 * Position-only pipeline rendering into the shadow map. There is no colour
 * target; only depth is written.
 */
pub fn mk_depth_pipeline(
    device: &wgpu::Device,
    layouts: &super::Layouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Depth Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.light_space), Some(&layouts.model)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Depth Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    let mut depth = depth_state(true, wgpu::CompareFunction::LessEqual);
    // against shadow acne
    depth.bias = wgpu::DepthBiasState {
        constant: 2,
        slope_scale: 2.0,
        clamp: 0.0,
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        None,
        None,
        Some(depth),
        primitive(wgpu::PrimitiveTopology::TriangleList, Some(wgpu::Face::Back)),
        &[MeshVertex::desc()],
        shader,
    )
}

/**
 * The skybox is a full-screen triangle at the far plane. It is drawn after all
 * opaque geometry and only where nothing closer was written.
 */
pub fn mk_skybox_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &super::Layouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Skybox Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.frame), Some(&layouts.cube)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Skybox Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        Some(color_format),
        None,
        Some(depth_state(false, wgpu::CompareFunction::LessEqual)),
        primitive(wgpu::PrimitiveTopology::TriangleList, None),
        &[],
        shader,
    )
}

pub fn depth_state(write: bool, compare: wgpu::CompareFunction) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: Texture::DEPTH_FORMAT,
        depth_write_enabled: Some(write),
        depth_compare: Some(compare),
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub fn primitive(
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// `color_format: None` builds a depth-only pipeline without a fragment stage.
#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: Option<wgpu::TextureFormat>,
    blend: Option<wgpu::BlendState>,
    depth_stencil: Option<wgpu::DepthStencilState>,
    primitive: wgpu::PrimitiveState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let label = shader.label.map(|label| label.replace("Shader", "Pipeline"));
    let shader = device.create_shader_module(shader);
    let targets = [color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend,
        write_mask: wgpu::ColorWrites::ALL,
    })];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: label.as_deref(),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: color_format.map(|_| wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive,
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
