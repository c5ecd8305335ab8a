//! Command scripts: the JSON stand-in for a presentation layer.
//!
//! A script is a JSON array of commands tagged by `"cmd"`:
//!
//! ```json
//! [
//!   { "cmd": "view_size", "width": 400, "height": 300 },
//!   { "cmd": "load_image", "source": "scan.png" },
//!   { "cmd": "pointer", "device": "pen", "phase": "down", "position": { "x": 10, "y": 10 } },
//!   { "cmd": "save_image", "destination": "scan-annotated.png" }
//! ]
//! ```

use crate::AppError;
use penslate_core::{InkMode, PenProximity, PointerEvent};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One scripted user action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Pointer(PointerEvent),
    Proximity { signal: PenProximity },
    SetMouse { enabled: bool },
    SetTouch { enabled: bool },
    Mode { mode: InkMode },
    ViewSize { width: f64, height: f64 },
    ZoomIn,
    ZoomOut,
    ResetZoom,
    FitToScreen { width: f64, height: f64 },
    LoadImage { source: String },
    SaveImage { destination: String },
    ClearAll,
    SimplifyAll { tolerance: f64 },
}

/// Parse a script from JSON text.
pub fn parse(json: &str) -> Result<Vec<Command>, AppError> {
    Ok(serde_json::from_str(json)?)
}

/// Read and parse a script file.
pub fn load(path: &Path) -> Result<Vec<Command>, AppError> {
    let json = fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let commands = parse(&json)?;
    log::info!("Loaded {} commands from {}", commands.len(), path.display());
    Ok(commands)
}
