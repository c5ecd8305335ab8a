//! File-based image storage for native platforms.

use super::{BoxFuture, ImageStorage, StorageError, StorageResult};
use crate::background::{BackgroundImage, FlattenedCanvas, ImageFormat};
use crate::stroke::Stroke;
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Suffix appended to a save destination for the stroke sidecar file.
pub const STROKES_SIDECAR_SUFFIX: &str = ".strokes.json";

/// Sidecar written next to a saved image.
#[derive(Serialize)]
struct StrokeSidecar<'a> {
    width: f64,
    height: f64,
    strokes: &'a [Stroke],
}

/// File-based image storage.
///
/// Relative sources and destinations resolve against `base_path`. Saving
/// writes the background bytes unchanged to the destination and the strokes
/// as JSON to `<destination>.strokes.json`.
pub struct FileImageStorage {
    /// Base directory for relative paths.
    base_path: PathBuf,
}

impl FileImageStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/penslate/images/`
    /// On Windows: `%LOCALAPPDATA%\penslate\images\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("penslate").join("images"))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn sidecar_path(destination: &Path) -> PathBuf {
        let mut name = destination.as_os_str().to_os_string();
        name.push(STROKES_SIDECAR_SUFFIX);
        PathBuf::from(name)
    }
}

fn decode(path: &Path, bytes: Vec<u8>) -> StorageResult<BackgroundImage> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .map_err(|e| StorageError::Io(e.to_string()))?
        .into_dimensions()
        .map_err(|e| StorageError::Decode(format!("{}: {}", path.display(), e)))?;

    let format = ImageFormat::from_magic_bytes(&bytes).or_else(|| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension)
    });

    let mut image = BackgroundImage::new(bytes, width, height).with_source(path.display().to_string());
    if let Some(format) = format {
        image = image.with_format(format);
    }
    Ok(image)
}

impl ImageStorage for FileImageStorage {
    fn load_image(&self, source: &str) -> BoxFuture<'_, StorageResult<BackgroundImage>> {
        let path = self.resolve(source);
        let source = source.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(source));
            }
            let bytes = fs::read(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let image = decode(&path, bytes)?;
            log::info!(
                "Loaded background {} ({}x{})",
                path.display(),
                image.width(),
                image.height()
            );
            Ok(image)
        })
    }

    fn save_image(
        &self,
        canvas: &FlattenedCanvas,
        destination: &str,
    ) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.resolve(destination);
        let size = canvas.size();
        let sidecar = StrokeSidecar {
            width: size.width,
            height: size.height,
            strokes: &canvas.strokes,
        };
        let json = match serde_json::to_string_pretty(&sidecar) {
            Ok(j) => j,
            Err(e) => {
                return Box::pin(async move { Err(StorageError::Serialization(e.to_string())) });
            }
        };
        let background = canvas.background.clone();

        Box::pin(async move {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Io(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
            if let Some(background) = background {
                fs::write(&path, background.content()).map_err(|e| {
                    StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
                })?;
            }
            let sidecar_path = Self::sidecar_path(&path);
            fs::write(&sidecar_path, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", sidecar_path.display(), e))
            })?;
            log::info!("Saved canvas to {}", path.display());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeStyle;
    use kurbo::Point;
    use pollster::block_on;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(width, height).save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_decodes_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        write_png(temp_dir.path(), "bg.png", 8, 6);
        let storage = FileImageStorage::new(temp_dir.path().to_path_buf()).unwrap();

        let image = block_on(storage.load_image("bg.png")).unwrap();
        assert_eq!((image.width(), image.height()), (8, 6));
        assert_eq!(image.format(), Some(ImageFormat::Png));
    }

    #[test]
    fn test_load_absolute_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_png(temp_dir.path(), "abs.png", 3, 2);
        let storage = FileImageStorage::new(temp_dir.path().join("unused")).unwrap();

        let image = block_on(storage.load_image(path.to_str().unwrap())).unwrap();
        assert_eq!(image.width(), 3);
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileImageStorage::new(temp_dir.path().to_path_buf()).unwrap();
        let result = block_on(storage.load_image("nope.png"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_load_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("junk.png"), b"definitely not an image").unwrap();
        let storage = FileImageStorage::new(temp_dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.load_image("junk.png"));
        assert!(matches!(result, Err(StorageError::Decode(_))));
    }

    #[test]
    fn test_save_writes_image_and_sidecar() {
        let temp_dir = TempDir::new().unwrap();
        write_png(temp_dir.path(), "bg.png", 4, 4);
        let storage = FileImageStorage::new(temp_dir.path().to_path_buf()).unwrap();
        let background = block_on(storage.load_image("bg.png")).unwrap();

        let stroke = Stroke::from_positions(
            &[Point::new(0.0, 0.0), Point::new(2.0, 2.0)],
            StrokeStyle::default(),
        );
        let canvas = FlattenedCanvas {
            background: Some(background.clone()),
            strokes: vec![stroke.clone()],
        };
        block_on(storage.save_image(&canvas, "out/annotated.png")).unwrap();

        let out = temp_dir.path().join("out").join("annotated.png");
        assert_eq!(fs::read(&out).unwrap(), background.content());

        let sidecar = fs::read_to_string(temp_dir.path().join("out/annotated.png.strokes.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(value["width"], 4.0);
        assert_eq!(value["strokes"].as_array().unwrap().len(), 1);
        assert_eq!(value["strokes"][0]["id"], stroke.id().to_string());
    }

    #[test]
    fn test_save_ink_only() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileImageStorage::new(temp_dir.path().to_path_buf()).unwrap();
        let canvas = FlattenedCanvas {
            background: None,
            strokes: vec![Stroke::from_positions(&[Point::new(5.0, 5.0)], StrokeStyle::default())],
        };
        block_on(storage.save_image(&canvas, "ink.png")).unwrap();

        assert!(!temp_dir.path().join("ink.png").exists());
        assert!(temp_dir.path().join("ink.png.strokes.json").exists());
    }
}
