//! Read-only asset sources.
//!
//! Meshes and shader bytecode are addressed by logical, slash-separated
//! paths such as `shaders/color_vert.spv`. An [`AssetSource`] resolves them to
//! bytes. Reads are blocking and are expected to run on the renderer's task
//! pool, never on the surface owner's thread.

mod mesh;

pub use mesh::{Mesh, MeshData, MESH_FORMAT, VERTEX_STRIDE};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

/// Errors raised while reading or decoding an asset.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed asset {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// A store of read-only assets.
pub trait AssetSource: Send + Sync + 'static {
    /// Read the entire contents of the asset at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError>;

    /// Check whether an asset exists at `path`.
    fn exists(&self, path: &str) -> bool;
}

/// Assets stored in a directory on disk.
///
/// The root is joined with the logical path; the directory does not need to
/// exist until the first read.
pub struct FileSystemAssets {
    root: PathBuf,
}

impl FileSystemAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetSource for FileSystemAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        std::fs::read(self.resolve(path)).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.to_owned())
            } else {
                AssetError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}

/// In-memory assets for tests and embedded data.
///
/// Clone is cheap and clones share contents. Every read is counted per path.
#[derive(Clone, Default)]
pub struct MemoryAssets {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    reads: Arc<RwLock<HashMap<String, usize>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an asset, replacing any existing one at the same path.
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.write().remove(path)
    }

    /// Number of `read` calls made for `path`, successful or not.
    pub fn read_count(&self, path: &str) -> usize {
        self.reads.read().get(path).copied().unwrap_or(0)
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        *self.reads.write().entry(path.to_owned()).or_insert(0) += 1;
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_owned()))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}
