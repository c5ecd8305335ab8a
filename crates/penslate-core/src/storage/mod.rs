//! Persistence collaborator for background images and saved canvases.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryImageStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::{FileImageStorage, STROKES_SIDECAR_SUFFIX};

use crate::background::{BackgroundImage, FlattenedCanvas};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors. The canvas treats all of them opaquely.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Unsupported or corrupt image: {0}")]
    Decode(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Loads background images and saves flattened canvases.
///
/// Both operations are single-shot; the canvas never retries.
#[cfg(not(target_arch = "wasm32"))]
pub trait ImageStorage: Send + Sync {
    /// Load and decode an image.
    fn load_image(&self, source: &str) -> BoxFuture<'_, StorageResult<BackgroundImage>>;

    /// Write a flattened canvas to `destination`.
    fn save_image(
        &self,
        canvas: &FlattenedCanvas,
        destination: &str,
    ) -> BoxFuture<'_, StorageResult<()>>;
}

/// Loads background images and saves flattened canvases (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait ImageStorage {
    /// Load and decode an image.
    fn load_image(&self, source: &str) -> BoxFuture<'_, StorageResult<BackgroundImage>>;

    /// Write a flattened canvas to `destination`.
    fn save_image(
        &self,
        canvas: &FlattenedCanvas,
        destination: &str,
    ) -> BoxFuture<'_, StorageResult<()>>;
}
