//! Debug line primitives queued during a frame and drawn after the scene.

use crate::{
    data_structures::mesh::Vertex,
    pipelines::basic::{depth_state, mk_render_pipeline, primitive},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub colour: [f32; 4],
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// A world-space segment with an RGBA colour.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line {
    pub from: cgmath::Vector3<f32>,
    pub to: cgmath::Vector3<f32>,
    pub colour: [f32; 4],
}

impl Line {
    pub fn vertices(&self) -> [LineVertex; 2] {
        [
            LineVertex {
                position: self.from.into(),
                colour: self.colour,
            },
            LineVertex {
                position: self.to.into(),
                colour: self.colour,
            },
        ]
    }
}

pub fn mk_lines_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &super::Layouts,
    source: &str,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lines Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.frame)],
        immediate_size: 0,
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Lines Shader"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        Some(color_format),
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some(depth_state(true, wgpu::CompareFunction::Less)),
        primitive(wgpu::PrimitiveTopology::LineList, None),
        &[LineVertex::desc()],
        shader,
    )
}
