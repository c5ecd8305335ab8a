//! Penslate headless driver.
//!
//! Replays JSON command scripts against a [`penslate_core::CanvasController`],
//! standing in for the presentation and command layers.

pub mod runner;
pub mod script;

use clap::Parser;
use penslate_core::{CanvasError, StorageError};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use runner::{RunSummary, ScriptRunner};
pub use script::Command;

/// Command-line arguments for the driver.
#[derive(Debug, Clone, Parser)]
#[command(name = "penslate")]
#[command(about = "Replay an ink canvas command script")]
#[command(version)]
pub struct CliArgs {
    /// JSON command script to play
    pub script: PathBuf,

    /// Canvas configuration file (JSON)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory that image sources and save destinations resolve against
    /// (defaults to the script's directory)
    #[arg(long)]
    pub images: Option<PathBuf>,
}

impl CliArgs {
    /// Directory that image paths in the script resolve against.
    pub fn images_dir(&self) -> PathBuf {
        match &self.images {
            Some(dir) => dir.clone(),
            None => self
                .script
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        }
    }
}

/// Driver errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_default_to_script_dir() {
        let args = CliArgs::parse_from(["penslate", "/tmp/sessions/scan.json"]);
        assert_eq!(args.images_dir(), PathBuf::from("/tmp/sessions"));

        let bare = CliArgs::parse_from(["penslate", "scan.json"]);
        assert_eq!(bare.images_dir(), PathBuf::from("."));

        let explicit = CliArgs::parse_from(["penslate", "scan.json", "--images", "/srv/scans"]);
        assert_eq!(explicit.images_dir(), PathBuf::from("/srv/scans"));
    }
}
