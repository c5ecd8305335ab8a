//! Canvas configuration.
//!
//! Every section carries `#[serde(default)]`, so a config file only needs the
//! keys it wants to override.

use crate::error::{CanvasError, CanvasResult};
use crate::stroke::StrokeStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Zoom bounds and step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Factor applied by one zoom-in step (divided by on zoom-out).
    pub zoom_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            zoom_step: 1.25,
        }
    }
}

impl ViewportConfig {
    pub fn validate(&self) -> CanvasResult<()> {
        let finite = [self.min_scale, self.max_scale, self.zoom_step]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CanvasError::Config("viewport values must be finite".to_string()));
        }
        if self.min_scale <= 0.0 {
            return Err(CanvasError::Config(format!(
                "min_scale must be positive, got {}",
                self.min_scale
            )));
        }
        if self.min_scale > self.max_scale {
            return Err(CanvasError::Config(format!(
                "min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if self.zoom_step <= 1.0 {
            return Err(CanvasError::Config(format!(
                "zoom_step must be greater than 1, got {}",
                self.zoom_step
            )));
        }
        Ok(())
    }
}

/// Ink capture settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkConfig {
    /// Style applied to newly drawn strokes.
    pub default_style: StrokeStyle,
    /// Eraser reach in content units, on top of each stroke's half width.
    pub erase_tolerance: f64,
    /// When set, completed strokes are simplified with this tolerance.
    pub simplify_tolerance: Option<f64>,
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            default_style: StrokeStyle::default(),
            erase_tolerance: 4.0,
            simplify_tolerance: None,
        }
    }
}

/// Initial user preferences for input devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialDevices {
    pub mouse_enabled: bool,
    pub touch_enabled: bool,
}

impl Default for InitialDevices {
    fn default() -> Self {
        Self {
            mouse_enabled: true,
            touch_enabled: true,
        }
    }
}

/// Save availability rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Only allow saving when a background image is loaded.
    pub require_background: bool,
}

/// Top-level canvas configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub viewport: ViewportConfig,
    pub ink: InkConfig,
    pub devices: InitialDevices,
    pub save: SaveConfig,
}

impl CanvasConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CanvasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            CanvasError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded canvas config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> CanvasResult<()> {
        self.viewport.validate()?;
        if !self.ink.erase_tolerance.is_finite() || self.ink.erase_tolerance < 0.0 {
            return Err(CanvasError::Config(format!(
                "erase_tolerance must be a non-negative number, got {}",
                self.ink.erase_tolerance
            )));
        }
        if let Some(tolerance) = self.ink.simplify_tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(CanvasError::Config(format!(
                    "simplify_tolerance must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }
        if !self.ink.default_style.width.is_finite() || self.ink.default_style.width <= 0.0 {
            return Err(CanvasError::Config(format!(
                "stroke width must be positive, got {}",
                self.ink.default_style.width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::PenTip;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = CanvasConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.viewport.zoom_step - 1.25).abs() < f64::EPSILON);
        assert!(!config.save.require_background);
        assert!(config.devices.mouse_enabled && config.devices.touch_enabled);
    }

    #[test]
    fn test_partial_json() {
        let config = CanvasConfig::from_json(
            r#"{ "viewport": { "max_scale": 4.0 }, "ink": { "default_style": { "color": { "r": 255, "g": 0, "b": 0, "a": 255 }, "width": 6.0 } } }"#,
        )
        .unwrap();
        assert!((config.viewport.max_scale - 4.0).abs() < f64::EPSILON);
        assert!((config.viewport.min_scale - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.ink.default_style.tip, PenTip::Circle);
        assert_eq!(config.ink.default_style.color.r, 255);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let result = CanvasConfig::from_json(r#"{ "viewport": { "min_scale": 5.0, "max_scale": 2.0 } }"#);
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }

    #[test]
    fn test_rejects_shrinking_zoom_step() {
        let result = CanvasConfig::from_json(r#"{ "viewport": { "zoom_step": 0.8 } }"#);
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            CanvasConfig::from_json("{ not json"),
            Err(CanvasError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "save": {{ "require_background": true }} }}"#).unwrap();

        let config = CanvasConfig::load(file.path()).unwrap();
        assert!(config.save.require_background);
    }

    #[test]
    fn test_load_missing_file() {
        let result = CanvasConfig::load("/nonexistent/penslate.json");
        assert!(matches!(result, Err(CanvasError::Config(_))));
    }
}
