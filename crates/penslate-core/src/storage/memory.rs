//! In-memory image storage.

use super::{BoxFuture, ImageStorage, StorageError, StorageResult};
use crate::background::{BackgroundImage, FlattenedCanvas};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory storage for testing and headless use.
#[derive(Default)]
pub struct MemoryImageStorage {
    images: RwLock<HashMap<String, BackgroundImage>>,
    saved: RwLock<HashMap<String, FlattenedCanvas>>,
    read_only: AtomicBool,
}

impl MemoryImageStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an image available under `source`.
    pub fn insert_image(&self, source: &str, image: BackgroundImage) -> StorageResult<()> {
        let mut images = self
            .images
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        images.insert(source.to_string(), image.with_source(source));
        Ok(())
    }

    /// The canvas last saved to `destination`.
    pub fn saved(&self, destination: &str) -> Option<FlattenedCanvas> {
        self.saved.read().ok()?.get(destination).cloned()
    }

    /// When set, every save fails with an IO error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }
}

impl ImageStorage for MemoryImageStorage {
    fn load_image(&self, source: &str) -> BoxFuture<'_, StorageResult<BackgroundImage>> {
        let source = source.to_string();
        Box::pin(async move {
            let images = self
                .images
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            images
                .get(&source)
                .cloned()
                .ok_or(StorageError::NotFound(source))
        })
    }

    fn save_image(
        &self,
        canvas: &FlattenedCanvas,
        destination: &str,
    ) -> BoxFuture<'_, StorageResult<()>> {
        let destination = destination.to_string();
        let canvas = canvas.clone();
        Box::pin(async move {
            if self.read_only.load(Ordering::Relaxed) {
                return Err(StorageError::Io(format!("{} is read-only", destination)));
            }
            let mut saved = self
                .saved
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            saved.insert(destination, canvas);
            Ok(())
        })
    }
}
