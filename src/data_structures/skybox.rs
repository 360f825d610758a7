//! Cube-mapped background drawn behind everything else.

use std::sync::Arc;

use crate::{
    data_structures::texture::Texture,
    render::{DrawContext, PrepareContext},
    resources::texture::TextureData,
};

/// Face images for [`crate::scene::Scene::add_skybox`]. All six must share one size.
#[derive(Clone, Debug, Default)]
pub struct SkyboxFaces {
    pub right: String,
    pub left: String,
    pub top: String,
    pub bottom: String,
    pub front: String,
    pub back: String,
}

impl SkyboxFaces {
    /// Paths in cube layer order: +X, -X, +Y, -Y, +Z, -Z.
    pub fn paths(&self) -> [&str; 6] {
        [
            &self.right,
            &self.left,
            &self.top,
            &self.bottom,
            &self.front,
            &self.back,
        ]
    }
}

#[derive(Debug)]
pub struct Skybox {
    faces: [Arc<TextureData>; 6],
    cube: Option<wgpu::BindGroup>,
}

impl Skybox {
    /// Fails if the faces differ in size.
    pub fn new(faces: [Arc<TextureData>; 6]) -> anyhow::Result<Self> {
        let size = faces[0].dimensions();
        if let Some(face) = faces.iter().find(|face| face.dimensions() != size) {
            anyhow::bail!(
                "skybox face {} is {:?}, the first face is {:?}",
                face.path,
                face.dimensions(),
                size
            );
        }
        Ok(Self { faces, cube: None })
    }

    pub fn faces(&self) -> &[Arc<TextureData>; 6] {
        &self.faces
    }

    pub fn prepare(&mut self, gpu: &mut PrepareContext<'_>) -> anyhow::Result<()> {
        if self.cube.is_some() {
            return Ok(());
        }
        let texture = Texture::create_cube(gpu.device, gpu.queue, &self.faces, "skybox")?;
        self.cube = Some(texture.bind_group(gpu.device, &gpu.layouts.cube, "skybox"));
        Ok(())
    }

    /// Full-screen triangle at the far plane; needs `LessEqual` depth compare.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        let Some(cube) = &self.cube else {
            return;
        };
        pass.set_pipeline(&ctx.pipelines.skybox);
        pass.set_bind_group(0, ctx.frame, &[]);
        pass.set_bind_group(1, cube, &[]);
        pass.draw(0..3, 0..1);
    }
}
