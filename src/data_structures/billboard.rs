//! Camera-facing textured quads.

use std::sync::Arc;

use crate::{
    data_structures::{entity::Drawable, instance::WorldTransform},
    render::{DrawContext, PrepareContext, UniformBinding},
    resources::texture::TextureData,
};

/// Parameters for [`crate::scene::Scene::add_billboard`].
#[derive(Clone, Debug)]
pub struct BillboardConfig {
    pub texture: String,
    /// `true` keeps the quad upright: it only turns around the world Y axis.
    pub vertical: bool,
    pub width: f32,
    pub height: f32,
}

impl Default for BillboardConfig {
    fn default() -> Self {
        Self {
            texture: String::new(),
            vertical: false,
            width: 1.0,
            height: 1.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BillboardUniform {
    center: [f32; 3],
    vertical: u32,
    size: [f32; 2],
    _padding: [f32; 2],
}

#[derive(Debug)]
struct BillboardGpu {
    quad: UniformBinding,
    material: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct Billboard {
    texture: Arc<TextureData>,
    pub vertical: bool,
    pub width: f32,
    pub height: f32,
    gpu: Option<BillboardGpu>,
}

impl Billboard {
    pub fn new(texture: Arc<TextureData>, vertical: bool, width: f32, height: f32) -> Self {
        Self {
            texture,
            vertical,
            width,
            height,
            gpu: None,
        }
    }

    pub fn texture(&self) -> &Arc<TextureData> {
        &self.texture
    }

    fn uniform(&self, world: &WorldTransform) -> BillboardUniform {
        let scale = world.scale();
        BillboardUniform {
            center: world.position().into(),
            vertical: self.vertical as u32,
            size: [self.width * scale.x, self.height * scale.y],
            _padding: [0.0; 2],
        }
    }
}

impl Drawable for Billboard {
    fn prepare(&mut self, world: &WorldTransform, gpu: &mut PrepareContext<'_>) -> anyhow::Result<()> {
        let uniform = self.uniform(world);
        match &self.gpu {
            Some(billboard_gpu) => billboard_gpu.quad.write(gpu.queue, &uniform),
            None => {
                let texture = gpu.cache.texture(gpu.device, gpu.queue, &self.texture);
                let material =
                    texture.bind_group(gpu.device, &gpu.layouts.texture, "billboard material");
                let quad =
                    UniformBinding::new(gpu.device, &gpu.layouts.model, &uniform, "billboard");
                self.gpu = Some(BillboardGpu { quad, material });
            }
        }
        Ok(())
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        let Some(billboard_gpu) = &self.gpu else {
            return;
        };
        pass.set_pipeline(&ctx.pipelines.billboard);
        pass.set_bind_group(0, ctx.frame, &[]);
        pass.set_bind_group(1, &billboard_gpu.quad.bind_group, &[]);
        pass.set_bind_group(2, &billboard_gpu.material, &[]);
        pass.draw(0..6, 0..1);
    }

    fn bounding_extent(&self) -> Option<f32> {
        Some(self.width.max(self.height))
    }
}
