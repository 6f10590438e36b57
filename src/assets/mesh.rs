//! `.buf` mesh loading.
//!
//! Layout, all little-endian:
//!
//! | Offset | Contents |
//! |---|---|
//! | 0 | `u32` format tag, always [`MESH_FORMAT`] |
//! | 4 | `u32` vertex count |
//! | 8 | 6 × `f32` bounding box (min xyz, max xyz) |
//! | 32 | vertex count × [`VERTEX_STRIDE`] bytes of interleaved vertices |
//!
//! Each vertex is position (3 floats), uv (2 floats) and normal (3 floats).

use std::sync::Arc;

use glam::Vec3;

use super::{AssetError, AssetSource};
use crate::task::{AsyncLoad, TaskPool};

pub const MESH_FORMAT: u32 = 1;
/// Bytes per interleaved vertex.
pub const VERTEX_STRIDE: usize = 8 * std::mem::size_of::<f32>();

const HEADER_SIZE: usize = 8 + 6 * std::mem::size_of::<f32>();

/// Decoded mesh geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertex_count: u32,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
    /// Raw interleaved vertex bytes, `vertex_count * VERTEX_STRIDE` long
    pub geometry: Vec<u8>,
}

impl MeshData {
    /// Decode a `.buf` file. `path` is only used in error messages.
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let malformed = |reason: String| AssetError::Malformed {
            path: path.to_owned(),
            reason,
        };

        if bytes.len() < HEADER_SIZE {
            return Err(malformed(format!(
                "file is {} bytes, header needs {HEADER_SIZE}",
                bytes.len()
            )));
        }

        let word = |index: usize| {
            let start = index * 4;
            [bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]]
        };

        let format = u32::from_le_bytes(word(0));
        if format != MESH_FORMAT {
            return Err(malformed(format!("unsupported format tag {format}")));
        }

        let vertex_count = u32::from_le_bytes(word(1));
        let float = |index: usize| f32::from_le_bytes(word(index));
        let aabb_min = Vec3::new(float(2), float(3), float(4));
        let aabb_max = Vec3::new(float(5), float(6), float(7));

        let geometry_size = vertex_count as usize * VERTEX_STRIDE;
        let geometry = bytes
            .get(HEADER_SIZE..HEADER_SIZE + geometry_size)
            .ok_or_else(|| {
                malformed(format!(
                    "{vertex_count} vertices need {geometry_size} bytes, found {}",
                    bytes.len() - HEADER_SIZE
                ))
            })?
            .to_vec();

        Ok(Self {
            vertex_count,
            aabb_min,
            aabb_max,
            geometry,
        })
    }

    /// A mesh is usable once it has at least one vertex.
    pub fn is_valid(&self) -> bool {
        self.vertex_count > 0
    }
}

/// A mesh loaded in the background.
///
/// Failed loads are logged and resolve to an empty, invalid mesh.
#[derive(Clone)]
pub struct Mesh {
    name: &'static str,
    load: AsyncLoad<Arc<MeshData>>,
}

impl Mesh {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            load: AsyncLoad::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Start reading and decoding `path` on `pool`.
    pub fn load(&self, pool: &TaskPool, assets: Arc<dyn AssetSource>, path: String) {
        let name = self.name;
        self.load.start(pool, "mesh load", move || {
            let mesh = assets
                .read(&path)
                .and_then(|bytes| MeshData::parse(&path, &bytes));
            match mesh {
                Ok(mesh) => {
                    log::debug!("Loaded {name} mesh from {path}: {} vertices", mesh.vertex_count);
                    Arc::new(mesh)
                }
                Err(e) => {
                    log::warn!("Failed to load {name} mesh: {e}");
                    Arc::new(MeshData::default())
                }
            }
        });
    }

    /// The loaded mesh, blocking until the load finishes.
    ///
    /// An empty mesh is returned when no load was started.
    pub fn data(&self) -> Arc<MeshData> {
        self.load.get().unwrap_or_default()
    }

    pub fn is_started(&self) -> bool {
        self.load.is_started()
    }

    pub fn is_valid(&self) -> bool {
        self.data().is_valid()
    }
}
