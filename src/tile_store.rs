//! Tile raster storage

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::errors::AisStoreError;

/// Source of tile raster images, addressed by the raster file name stored
/// with each tile.
pub trait TileStore: Send + Sync {
    /// Read the raw bytes of a raster image
    fn read(&self, raster_file: &str) -> impl Future<Output = Result<Vec<u8>, AisStoreError>> + Send;
}

/// Raster images stored as files in one directory
#[derive(Debug, Clone)]
pub struct FsTileStore {
    root: PathBuf,
}

impl FsTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a raster file, rejecting names that leave the root directory
    fn path_of(&self, raster_file: &str) -> Result<PathBuf, AisStoreError> {
        let mut components = Path::new(raster_file).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(AisStoreError::InvalidRasterFile(raster_file.to_string())),
        }
    }
}

impl TileStore for FsTileStore {
    async fn read(&self, raster_file: &str) -> Result<Vec<u8>, AisStoreError> {
        let path = self.path_of(raster_file)?;
        debug!("Reading tile raster {}", path.display());
        Ok(tokio::fs::read(path).await?)
    }
}
