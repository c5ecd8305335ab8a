//! Background image content loaded under the ink.

use crate::stroke::Stroke;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Encoded image format of background bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        // RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Decoded-size metadata plus the encoded bytes of a background image.
///
/// Cloning shares the bytes.
#[derive(Debug, Clone)]
pub struct BackgroundImage {
    content: Arc<[u8]>,
    width: u32,
    height: u32,
    format: Option<ImageFormat>,
    source: Option<String>,
}

impl BackgroundImage {
    pub fn new(content: impl Into<Arc<[u8]>>, width: u32, height: u32) -> Self {
        let content = content.into();
        let format = ImageFormat::from_magic_bytes(&content);
        Self {
            content,
            width,
            height,
            format,
            source: None,
        }
    }

    /// Record where the image came from (file path, document key...).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Everything the persistence collaborator needs to write the canvas out.
///
/// Rasterising the strokes onto the background is the collaborator's job.
#[derive(Debug, Clone)]
pub struct FlattenedCanvas {
    pub background: Option<BackgroundImage>,
    /// Strokes back to front.
    pub strokes: Vec<Stroke>,
}

impl FlattenedCanvas {
    /// Logical size of the output: the background if there is one, else the ink bounds.
    pub fn size(&self) -> Size {
        if let Some(background) = &self.background {
            return background.size();
        }
        self.strokes
            .iter()
            .filter(|s| !s.is_empty())
            .map(Stroke::bounds)
            .reduce(|acc, b| acc.union(b))
            .map(|r| Size::new(r.x1.max(0.0), r.y1.max(0.0)))
            .unwrap_or(Size::ZERO)
    }
}
