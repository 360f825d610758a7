//! Mesh geometry (CPU and GPU) and the mesh entity.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{entity::Drawable, instance::WorldTransform},
    render::{DrawContext, PrepareContext, UniformBinding},
    resources::texture::TextureData,
};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Triangle geometry as loaded from disk, with its axis-aligned bounds.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub path: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl MeshData {
    pub fn new(path: impl Into<String>, vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for vertex in &vertices {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex.position[axis]);
                max[axis] = max[axis].max(vertex.position[axis]);
            }
        }
        if vertices.is_empty() {
            min = [0.0; 3];
            max = [0.0; 3];
        }
        Self {
            path: path.into(),
            vertices,
            indices,
            min,
            max,
        }
    }

    /// Side length of the smallest cube that contains the bounding box.
    pub fn bounding_size(&self) -> f32 {
        (0..3)
            .map(|axis| self.max[axis] - self.min[axis])
            .fold(0.0, f32::max)
    }
}

/// Vertex and index buffers of one [`MeshData`], shared by every node using it.
#[derive(Debug)]
pub struct Geometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl Geometry {
    pub fn upload(device: &wgpu::Device, data: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", data.path)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", data.path)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: data.indices.len() as u32,
        }
    }
}

/// Parameters for [`crate::scene::Scene::add_mesh`].
#[derive(Clone, Debug)]
pub struct MeshConfig {
    /// `.obj`, `.gltf` or `.glb` file. `None` creates an empty mesh node whose
    /// geometry can be set later with [`Mesh::set_mesh`].
    pub mesh: Option<String>,
    /// Diffuse texture. Meshes without one are shaded white.
    pub texture: Option<String>,
    /// Whether the mesh is rendered into the shadow map. Default `true`.
    pub casts_shadows: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            mesh: None,
            texture: None,
            casts_shadows: true,
        }
    }
}

impl MeshConfig {
    pub fn from_file(path: impl Into<String>) -> Self {
        Self {
            mesh: Some(path.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct MeshGpu {
    source: Arc<MeshData>,
    geometry: Arc<Geometry>,
    model: UniformBinding,
    material: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct Mesh {
    data: Option<Arc<MeshData>>,
    texture: Option<Arc<TextureData>>,
    pub casts_shadows: bool,
    gpu: Option<MeshGpu>,
}

impl Mesh {
    pub fn new(
        data: Option<Arc<MeshData>>,
        texture: Option<Arc<TextureData>>,
        casts_shadows: bool,
    ) -> Self {
        Self {
            data,
            texture,
            casts_shadows,
            gpu: None,
        }
    }

    pub fn mesh(&self) -> Option<&Arc<MeshData>> {
        self.data.as_ref()
    }

    pub fn texture(&self) -> Option<&Arc<TextureData>> {
        self.texture.as_ref()
    }

    /// Replace the geometry. GPU state is rebuilt on the next prepare.
    pub fn set_mesh(&mut self, data: Arc<MeshData>) {
        self.data = Some(data);
        self.gpu = None;
    }

    pub fn set_texture(&mut self, texture: Option<Arc<TextureData>>) {
        self.texture = texture;
        self.gpu = None;
    }
}

impl Drawable for Mesh {
    fn prepare(&mut self, world: &WorldTransform, gpu: &mut PrepareContext<'_>) -> anyhow::Result<()> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        let uniform = world.to_raw();
        if let Some(mesh_gpu) = &self.gpu {
            if Arc::ptr_eq(&mesh_gpu.source, data) {
                mesh_gpu.model.write(gpu.queue, &uniform);
                return Ok(());
            }
        }
        let geometry = gpu.cache.geometry(gpu.device, data);
        let texture = gpu
            .cache
            .texture_or_white(gpu.device, gpu.queue, self.texture.as_ref());
        let material = texture.bind_group(gpu.device, &gpu.layouts.texture, "mesh material");
        let model = UniformBinding::new(gpu.device, &gpu.layouts.model, &uniform, "mesh model");
        self.gpu = Some(MeshGpu {
            source: data.clone(),
            geometry,
            model,
            material,
        });
        Ok(())
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        let Some(mesh_gpu) = &self.gpu else {
            return;
        };
        if mesh_gpu.geometry.num_elements == 0 {
            return;
        }
        pass.set_pipeline(&ctx.pipelines.lit);
        pass.set_bind_group(0, ctx.frame, &[]);
        pass.set_bind_group(1, &mesh_gpu.model.bind_group, &[]);
        pass.set_bind_group(2, &mesh_gpu.material, &[]);
        pass.set_vertex_buffer(0, mesh_gpu.geometry.vertex_buffer.slice(..));
        pass.set_index_buffer(
            mesh_gpu.geometry.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.draw_indexed(0..mesh_gpu.geometry.num_elements, 0, 0..1);
    }

    fn draw_depth_map(&self, pass: &mut wgpu::RenderPass<'_>, ctx: &DrawContext<'_>) {
        if !self.casts_shadows {
            return;
        }
        let Some(mesh_gpu) = &self.gpu else {
            return;
        };
        if mesh_gpu.geometry.num_elements == 0 {
            return;
        }
        pass.set_pipeline(&ctx.pipelines.depth);
        pass.set_bind_group(0, ctx.light_space, &[]);
        pass.set_bind_group(1, &mesh_gpu.model.bind_group, &[]);
        pass.set_vertex_buffer(0, mesh_gpu.geometry.vertex_buffer.slice(..));
        pass.set_index_buffer(
            mesh_gpu.geometry.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.draw_indexed(0..mesh_gpu.geometry.num_elements, 0, 0..1);
    }

    fn bounding_extent(&self) -> Option<f32> {
        self.data.as_ref().map(|data| data.bounding_size())
    }
}
