//! Loading of meshes, textures and shaders from the asset directory.
//!
//! [`ResourceManager`] hands out shared `Arc` handles keyed by the requested
//! path, so every node referencing the same file shares one decoded copy.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use log::debug;

use crate::{data_structures::mesh::MeshData, resources::texture::TextureData};

pub mod mesh;
pub mod texture;

/// Shaders compiled into the crate, addressable as `builtin/<name>.wgsl`.
pub const BUILTIN_SHADERS: &[(&str, &str)] = &[
    ("builtin/lit.wgsl", include_str!("../pipelines/lit.wgsl")),
    ("builtin/depth.wgsl", include_str!("../pipelines/depth.wgsl")),
    ("builtin/skybox.wgsl", include_str!("../pipelines/skybox.wgsl")),
    ("builtin/billboard.wgsl", include_str!("../pipelines/billboard.wgsl")),
    ("builtin/particles.wgsl", include_str!("../pipelines/particles.wgsl")),
    ("builtin/lines.wgsl", include_str!("../pipelines/lines.wgsl")),
];

/// A vertex and a fragment stage that passed the entry point check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    pub vertex_path: String,
    pub fragment_path: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderProgram {
    /// Single WGSL module holding both stages, as `wgpu` expects it.
    /// Identical sources are not repeated.
    pub fn source(&self) -> String {
        if self.vertex == self.fragment {
            self.vertex.clone()
        } else {
            format!("{}\n{}", self.vertex, self.fragment)
        }
    }
}

fn has_entry_point(source: &str, stage: &str, name: &str) -> bool {
    let mut tokens = source.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        if token != stage {
            continue;
        }
        if tokens.next() == Some("fn")
            && tokens
                .peek()
                .is_some_and(|next| next.starts_with(&format!("{name}(")) || *next == name)
        {
            return true;
        }
    }
    false
}

#[derive(Debug)]
pub struct ResourceManager {
    asset_dir: PathBuf,
    shaders: HashMap<(String, String), Arc<ShaderProgram>>,
    textures: HashMap<String, Arc<TextureData>>,
    meshes: HashMap<String, Arc<MeshData>>,
}

impl ResourceManager {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            shaders: HashMap::new(),
            textures: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Absolute paths are used as-is, everything else is relative to the asset directory.
    pub fn resolve(&self, file_name: &str) -> PathBuf {
        let path = Path::new(file_name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_dir.join(path)
        }
    }

    pub fn load_string(&self, file_name: &str) -> anyhow::Result<String> {
        if let Some((_, source)) = BUILTIN_SHADERS.iter().find(|(name, _)| *name == file_name) {
            return Ok(source.to_string());
        }
        let path = self.resolve(file_name);
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }

    pub fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.resolve(file_name);
        std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// Load (or fetch the cached) shader program. `vs_main` must be declared
    /// `@vertex` in the vertex source and `fs_main` `@fragment` in the fragment
    /// source. Geometry stages cannot be expressed in WGSL and are rejected.
    pub fn get_shader(
        &mut self,
        vertex_path: &str,
        fragment_path: &str,
        geometry_path: Option<&str>,
    ) -> anyhow::Result<Arc<ShaderProgram>> {
        if let Some(geometry_path) = geometry_path {
            bail!("geometry shader {geometry_path} is not supported by the render backend");
        }
        let key = (vertex_path.to_string(), fragment_path.to_string());
        if let Some(program) = self.shaders.get(&key) {
            return Ok(program.clone());
        }

        let vertex = self.load_string(vertex_path)?;
        let fragment = self.load_string(fragment_path)?;
        if !has_entry_point(&vertex, "@vertex", "vs_main") {
            bail!("{vertex_path} does not declare a `@vertex fn vs_main`");
        }
        if !has_entry_point(&fragment, "@fragment", "fs_main") {
            bail!("{fragment_path} does not declare a `@fragment fn fs_main`");
        }

        let program = Arc::new(ShaderProgram {
            vertex_path: vertex_path.to_string(),
            fragment_path: fragment_path.to_string(),
            vertex,
            fragment,
        });
        debug!("linked shader {vertex_path} + {fragment_path}");
        self.shaders.insert(key, program.clone());
        Ok(program)
    }

    pub fn get_texture(&mut self, file_name: &str) -> anyhow::Result<Arc<TextureData>> {
        if let Some(texture) = self.textures.get(file_name) {
            return Ok(texture.clone());
        }
        let bytes = self.load_binary(file_name)?;
        let texture = Arc::new(texture::decode_texture(file_name, &bytes)?);
        debug!("loaded texture {file_name}");
        self.textures.insert(file_name.to_string(), texture.clone());
        Ok(texture)
    }

    pub fn get_mesh(&mut self, file_name: &str) -> anyhow::Result<Arc<MeshData>> {
        if let Some(mesh) = self.meshes.get(file_name) {
            return Ok(mesh.clone());
        }
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let bytes = self.load_binary(file_name)?;
        let data = match extension.as_deref() {
            Some("obj") => mesh::parse_obj(file_name, &bytes)?,
            Some("gltf") | Some("glb") => {
                let base = Path::new(file_name)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                mesh::parse_gltf(file_name, &bytes, |uri| {
                    self.load_binary(&base.join(uri).to_string_lossy())
                })?
            }
            _ => bail!("unsupported mesh format: {file_name}"),
        };
        debug!(
            "loaded mesh {file_name}: {} vertices, {} indices",
            data.vertices.len(),
            data.indices.len()
        );
        let data = Arc::new(data);
        self.meshes.insert(file_name.to_string(), data.clone());
        Ok(data)
    }

    /// Number of cached handles of every kind.
    pub fn len(&self) -> usize {
        self.shaders.len() + self.textures.len() + self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

