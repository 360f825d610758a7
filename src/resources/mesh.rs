use std::io::{BufReader, Cursor};

use anyhow::Context;

use crate::data_structures::mesh::{MeshData, MeshVertex};

/// Parse Wavefront obj text into one triangle list. All objects in the file are
/// merged; materials are ignored since textures are assigned per node.
pub fn parse_obj(file_name: &str, bytes: &[u8]) -> anyhow::Result<MeshData> {
    let mut obj_reader = BufReader::new(Cursor::new(bytes));
    let (models, _) = tobj::load_obj_buf(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Ok(Default::default()),
    )
    .with_context(|| format!("parsing obj {file_name}"))?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for m in &models {
        let base = vertices.len() as u32;
        vertices.extend((0..m.mesh.positions.len() / 3).map(|i| MeshVertex {
            position: [
                m.mesh.positions[i * 3],
                m.mesh.positions[i * 3 + 1],
                m.mesh.positions[i * 3 + 2],
            ],
            // obj has v pointing up, textures are stored top row first
            tex_coords: [
                m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
        }));
        indices.extend(m.mesh.indices.iter().map(|index| base + index));
    }
    if models.is_empty() {
        anyhow::bail!("{file_name} contains no geometry");
    }
    Ok(MeshData::new(file_name, vertices, indices))
}

/// Parse a glTF document (`.gltf` or `.glb`). External buffers are fetched
/// through `load_buffer`, which receives the URI relative to the document.
pub fn parse_gltf(
    file_name: &str,
    bytes: &[u8],
    mut load_buffer: impl FnMut(&str) -> anyhow::Result<Vec<u8>>,
) -> anyhow::Result<MeshData> {
    let gltf = gltf::Gltf::from_slice(bytes).with_context(|| format!("parsing {file_name}"))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => anyhow::bail!("{file_name} references a missing binary chunk"),
            },
            gltf::buffer::Source::Uri(uri) => buffer_data.push(load_buffer(uri)?),
        }
    }

    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices = Vec::new();
    for mesh in gltf.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "skipping non-triangle primitive in mesh {:?} of {file_name}",
                    mesh.name()
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            let base = vertices.len();

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            vertices.extend(positions.map(|position| MeshVertex {
                position,
                normal: Default::default(),
                tex_coords: Default::default(),
            }));
            if let Some(normals) = reader.read_normals() {
                for (vertex, normal) in vertices[base..].iter_mut().zip(normals) {
                    vertex.normal = normal;
                }
            }
            if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                for (vertex, tex_coord) in vertices[base..].iter_mut().zip(tex_coords) {
                    vertex.tex_coords = tex_coord;
                }
            }

            let base = base as u32;
            match reader.read_indices() {
                Some(raw) => indices.extend(raw.into_u32().map(|index| base + index)),
                None => indices.extend(base..vertices.len() as u32),
            }
        }
    }
    if vertices.is_empty() {
        anyhow::bail!("{file_name} contains no triangle geometry");
    }
    Ok(MeshData::new(file_name, vertices, indices))
}
