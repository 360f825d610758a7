//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU GPU texture resources,
//! helpers for depth, cube and fallback textures, and [`GpuCache`], which makes
//! sure a loaded texture or mesh is uploaded at most once no matter how many
//! nodes reference it.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use anyhow::*;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::mesh::{Geometry, MeshData},
    resources::texture::TextureData,
};

/// A GPU texture with a view and optional sampler.
///
/// Wraps WGPU texture objects along with associated views and samplers.
/// Typically created via [`from_data`](Self::from_data) or
/// via [`create_depth_texture`](Self::create_depth_texture).
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing or shadow mapping.
    ///
    /// The sampler compares with `LessEqual`, so the same texture can be bound
    /// as a `texture_depth_2d` with a comparison sampler in the lit pass.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A 1x1 opaque white texture, bound wherever a mesh has no diffuse map so
    /// the lit shader never needs a second variant.
    pub fn create_white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("default white texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Texture {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// Upload decoded image data as an sRGB 2D texture.
    pub fn from_data(device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureData) -> Self {
        let (width, height) = data.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&data.path),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            data.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Build a cube texture from six faces ordered +X, -X, +Y, -Y, +Z, -Z
    /// (right, left, top, bottom, front, back). All faces must share one size.
    pub fn create_cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[Arc<TextureData>; 6],
        label: &str,
    ) -> Result<Self> {
        let (width, height) = faces[0].dimensions();
        if let Some(face) = faces.iter().find(|face| face.dimensions() != (width, height)) {
            bail!(
                "cube face {} is {:?}, expected {}x{}",
                face.path,
                face.dimensions(),
                width,
                height
            );
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, face) in faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                face.pixels(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    /// Bind this texture and its sampler as `(binding 0, binding 1)` of `layout`.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
    ) -> wgpu::BindGroup {
        let fallback;
        let sampler = match &self.sampler {
            Some(sampler) => sampler,
            None => {
                fallback = create_default_sampler(device);
                &fallback
            }
        };
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(label),
        })
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

/// Uploads keyed by the identity of the CPU-side `Arc` they were made from.
///
/// Each entry keeps a [`Weak`] to its source, so the address cannot be reused
/// by another allocation while the entry exists. Entries whose source has been
/// dropped are removed by [`purge`](Self::purge).
pub struct UploadCache<K, V> {
    entries: HashMap<usize, (Weak<K>, Arc<V>)>,
}

impl<K, V> UploadCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The upload made from `source`, running `upload` only the first time.
    pub fn get_or_upload(&mut self, source: &Arc<K>, upload: impl FnOnce(&K) -> V) -> Arc<V> {
        let (_, value) = self
            .entries
            .entry(Arc::as_ptr(source) as usize)
            .or_insert_with(|| (Arc::downgrade(source), Arc::new(upload(source))));
        value.clone()
    }

    /// Drop uploads whose source no longer exists. Returns how many were removed.
    pub fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (source, _)| source.strong_count() > 0);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for UploadCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU-side counterpart of the resource manager: uploads each loaded texture
/// and mesh once and hands out shared handles afterwards.
#[derive(Default)]
pub struct GpuCache {
    textures: UploadCache<TextureData, Texture>,
    geometry: UploadCache<MeshData, Geometry>,
    white: Option<Arc<Texture>>,
}

impl GpuCache {
    pub fn texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &Arc<TextureData>,
    ) -> Arc<Texture> {
        self.textures
            .get_or_upload(data, |data| Texture::from_data(device, queue, data))
    }

    /// The diffuse map for `data`, or the shared white texture when there is none.
    pub fn texture_or_white(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: Option<&Arc<TextureData>>,
    ) -> Arc<Texture> {
        match data {
            Some(data) => self.texture(device, queue, data),
            None => self
                .white
                .get_or_insert_with(|| Arc::new(Texture::create_white(device, queue)))
                .clone(),
        }
    }

    pub fn geometry(&mut self, device: &wgpu::Device, data: &Arc<MeshData>) -> Arc<Geometry> {
        self.geometry
            .get_or_upload(data, |data| Geometry::upload(device, data))
    }

    /// Release uploads of textures and meshes nothing references anymore.
    pub fn purge(&mut self) {
        let removed = self.textures.purge() + self.geometry.purge();
        if removed > 0 {
            log::debug!("released {removed} unused GPU upload(s)");
        }
    }

    pub fn len(&self) -> usize {
        self.textures.len() + self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
