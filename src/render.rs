//! The per-frame pass sequence.
//!
//! [`Renderer`] owns the pipelines, the shared bind group layouts, the GPU-side
//! resource cache and the per-frame uniforms. A frame is:
//!
//! 1. [`Renderer::prepare`] uploads the [`FrameContext`] and lets every visible
//!    entity create or refresh its GPU state.
//! 2. [`Renderer::draw_shadow_pass`] renders shadow casters into the shadow map.
//! 3. [`Renderer::draw_main_pass`] walks the tree for opaque entities, draws
//!    the skybox behind them, then the alpha blended entities and the queued
//!    debug lines.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        light::LightsUniform,
        texture::{GpuCache, Texture},
    },
    pipelines::{Layouts, LightSpaceUniform, Pipelines, lines::LineVertex},
    resources::ResourceManager,
    scene::{FrameContext, Scene},
};

/// A uniform buffer together with a bind group exposing it at binding 0.
#[derive(Debug)]
pub struct UniformBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    pub fn new<T: bytemuck::Pod>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        value: &T,
        label: &str,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }

    pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

/// What an entity needs to build its GPU state.
pub struct PrepareContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub layouts: &'a Layouts,
    pub cache: &'a mut GpuCache,
}

/// Shared state handed to every draw call of a pass.
pub struct DrawContext<'a> {
    pub pipelines: &'a Pipelines,
    pub frame: &'a wgpu::BindGroup,
    pub light_space: &'a wgpu::BindGroup,
}

pub struct Renderer {
    layouts: Layouts,
    pipelines: Pipelines,
    cache: GpuCache,
    frame_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    light_space: UniformBinding,
    shadow_map: Texture,
    shadow_map_size: u32,
    shadows_this_frame: bool,
    lines: Option<(wgpu::Buffer, u32)>,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        resources: &mut ResourceManager,
    ) -> anyhow::Result<Self> {
        let layouts = Layouts::new(device);
        let pipelines = Pipelines::new(device, color_format, &layouts, resources)?;

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Buffer"),
            size: std::mem::size_of::<crate::pipelines::FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lights Buffer"),
            size: std::mem::size_of::<LightsUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_space = UniformBinding::new(
            device,
            &layouts.light_space,
            &LightSpaceUniform {
                matrix: cgmath::Matrix4::<f32>::from_scale(1.0).into(),
            },
            "light_space",
        );
        // placeholder until a shadow light is bound
        let shadow_map = Texture::create_depth_texture(device, [1, 1], "shadow_map");
        let frame_bind_group = mk_frame_bind_group(
            device,
            &layouts,
            &frame_buffer,
            &lights_buffer,
            &shadow_map,
        );

        Ok(Self {
            layouts,
            pipelines,
            cache: GpuCache::default(),
            frame_buffer,
            lights_buffer,
            frame_bind_group,
            light_space,
            shadow_map,
            shadow_map_size: 1,
            shadows_this_frame: false,
            lines: None,
        })
    }

    pub fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    pub fn layouts(&self) -> &Layouts {
        &self.layouts
    }

    /// Number of textures and meshes uploaded so far.
    pub fn uploaded_resources(&self) -> usize {
        self.cache.len()
    }

    fn ensure_shadow_map(&mut self, device: &wgpu::Device, size: u32) {
        if self.shadow_map_size == size {
            return;
        }
        self.shadow_map = Texture::create_depth_texture(device, [size, size], "shadow_map");
        self.shadow_map_size = size;
        self.frame_bind_group = mk_frame_bind_group(
            device,
            &self.layouts,
            &self.frame_buffer,
            &self.lights_buffer,
            &self.shadow_map,
        );
    }

    /// Upload the frame uniforms and refresh the GPU state of every visible
    /// entity, the skybox and the debug line buffer.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &mut Scene,
        frame: &FrameContext,
        shadows_active: bool,
    ) {
        let shadow_size = scene.shadow_mapping().map(|shadow| shadow.size());
        self.shadows_this_frame = false;
        if let (true, Some(size), Some(matrix)) = (shadows_active, shadow_size, frame.light_space)
        {
            self.ensure_shadow_map(device, size);
            self.light_space.write(
                queue,
                &LightSpaceUniform {
                    matrix: matrix.into(),
                },
            );
            self.shadows_this_frame = true;
        }

        let (frame_uniform, lights_uniform) = frame.uniforms(self.shadows_this_frame);
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame_uniform));
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&lights_uniform));

        self.cache.purge();
        let mut ctx = PrepareContext {
            device,
            queue,
            layouts: &self.layouts,
            cache: &mut self.cache,
        };
        for (key, world) in scene.graph().collect_visible() {
            let Some(node) = scene.graph_mut().get_mut(key) else {
                continue;
            };
            let id = node.id();
            let Some(drawable) = node.entity_mut().and_then(|entity| entity.drawable_mut()) else {
                continue;
            };
            if let Err(e) = drawable.prepare(&world, &mut ctx) {
                log::warn!("node {id} could not be prepared and is skipped: {e:#}");
            }
        }
        if let Some(skybox) = scene.skybox_mut() {
            if let Err(e) = skybox.prepare(&mut ctx) {
                log::warn!("skybox could not be prepared: {e:#}");
            }
        }

        let vertices: Vec<LineVertex> = scene
            .debug_lines()
            .iter()
            .flat_map(|line| line.vertices())
            .collect();
        self.lines = (!vertices.is_empty()).then(|| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Debug Line Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            (buffer, vertices.len() as u32)
        });
    }

    fn draw_context(&self) -> DrawContext<'_> {
        DrawContext {
            pipelines: &self.pipelines,
            frame: &self.frame_bind_group,
            light_space: &self.light_space.bind_group,
        }
    }

    /// Render every shadow-casting mesh into the shadow map. Does nothing when
    /// shadows are off or no shadow light was resolved this frame.
    pub fn draw_shadow_pass(&self, encoder: &mut wgpu::CommandEncoder, scene: &Scene) {
        if !self.shadows_this_frame {
            return;
        }
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.shadow_map.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        let ctx = self.draw_context();
        for (_, node, _) in scene.graph().iter_visible() {
            if let Some(drawable) = node.entity().and_then(|entity| entity.drawable()) {
                drawable.draw_depth_map(&mut render_pass, &ctx);
            }
        }
    }

    /// Draw the opaque entities, the skybox, the alpha blended entities and
    /// finally the debug lines. The targets must already be cleared for this frame.
    pub fn draw_main_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        scene: &Scene,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });
        let ctx = self.draw_context();
        let draw_entities = |render_pass: &mut wgpu::RenderPass<'_>, blended: bool| {
            for (_, node, _) in scene.graph().iter_visible() {
                let Some(entity) = node.entity() else {
                    continue;
                };
                if entity.is_blended() != blended {
                    continue;
                }
                if let Some(drawable) = entity.drawable() {
                    drawable.draw(render_pass, &ctx);
                }
            }
        };
        draw_entities(&mut render_pass, false);
        // blended entities leave depth untouched, the sky must not cover them
        if let Some(skybox) = scene.skybox() {
            skybox.draw(&mut render_pass, &ctx);
        }
        draw_entities(&mut render_pass, true);
        if let Some((buffer, count)) = &self.lines {
            render_pass.set_pipeline(&self.pipelines.lines);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..*count, 0..1);
        }
    }
}

fn mk_frame_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    frame_buffer: &wgpu::Buffer,
    lights_buffer: &wgpu::Buffer,
    shadow_map: &Texture,
) -> wgpu::BindGroup {
    let fallback;
    let sampler = match &shadow_map.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = device.create_sampler(&wgpu::SamplerDescriptor {
                compare: Some(wgpu::CompareFunction::LessEqual),
                ..Default::default()
            });
            &fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &layouts.frame,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: lights_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("frame_bind_group"),
    })
}
