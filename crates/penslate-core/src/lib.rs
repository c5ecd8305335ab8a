//! Penslate Core Library
//!
//! Platform-agnostic state for the Penslate ink canvas: strokes over an
//! optional background image, pointer device arbitration and the viewport.

pub mod background;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod storage;
pub mod store;
pub mod stroke;
pub mod viewport;

pub use background::{BackgroundImage, FlattenedCanvas, ImageFormat};
pub use config::CanvasConfig;
pub use controller::{
    CanvasController, CanvasEvent, CommandState, InkMode, LoadTicket, PendingKind, SaveRequest,
    SaveTicket,
};
pub use device::{
    PenProximity, PointerDeviceArbiter, PointerDeviceKind, PointerDeviceState, PointerEvent,
    PointerPhase,
};
pub use error::{CanvasError, CanvasResult};
pub use storage::{ImageStorage, MemoryImageStorage, StorageError, StorageResult};
pub use store::{StrokeChange, StrokeStore};
pub use stroke::{InkPoint, Stroke, StrokeBuilder, StrokeId, StrokeStyle};
pub use viewport::{Viewport, ViewportChange, ViewportController};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileImageStorage;
