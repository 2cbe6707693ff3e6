// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene configuration, stored as RON.

use crate::style::StyleSheet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default key under which the clipboard bundle is stored
pub const DEFAULT_CLIPBOARD_KEY: &str = "visual_programming_env_clipboard";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON could not be written
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),

    /// Values are inconsistent
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunables of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Smallest zoom factor
    pub min_scale: f64,
    /// Largest zoom factor
    pub max_scale: f64,
    /// Scale at or below which the coarse level of detail is used;
    /// `None` derives it from the zoom range
    pub lod_threshold: Option<f64>,
    /// Distance from a resizable node's border that starts a resize
    pub resize_detection_distance: f64,
    /// Distance from a connector curve that still counts as a hit
    pub connector_hit_tolerance: f64,
    /// Key of the clipboard bundle in the host store
    pub clipboard_key: String,
    /// Maximum number of undo entries
    pub max_history: usize,
    /// Scale change per wheel delta unit
    pub wheel_zoom_factor: f64,
    /// Arrow-key nudge distance in scene units
    pub nudge_step: f64,
    /// Offset of duplicated nodes from the originals
    pub duplicate_offset: f64,
    /// Visual style
    pub style: StyleSheet,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.3,
            max_scale: 3.0,
            lod_threshold: None,
            resize_detection_distance: 4.0,
            connector_hit_tolerance: 5.0,
            clipboard_key: DEFAULT_CLIPBOARD_KEY.to_string(),
            max_history: 100,
            wheel_zoom_factor: -0.002,
            nudge_step: 1.0,
            duplicate_offset: 20.0,
            style: StyleSheet::default(),
        }
    }
}

impl SceneConfig {
    /// Parse from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Save to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "scale range [{}, {}] is empty or not positive",
                self.min_scale, self.max_scale
            )));
        }
        if self.max_history == 0 {
            return Err(ConfigError::Invalid("max_history must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SceneConfig::default();
        assert_eq!(config.min_scale, 0.3);
        assert_eq!(config.max_scale, 3.0);
        assert_eq!(config.clipboard_key, DEFAULT_CLIPBOARD_KEY);
        assert_eq!(config.max_history, 100);
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = SceneConfig::default();
        config.max_scale = 4.0;
        config.style.metrics.title_height = 30.0;
        let text = config.to_ron_string().unwrap();
        let loaded = SceneConfig::from_ron_str(&text).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let loaded = SceneConfig::from_ron_str("(max_scale: 5.0)").unwrap();
        assert_eq!(loaded.max_scale, 5.0);
        assert_eq!(loaded.min_scale, 0.3);
    }

    #[test]
    fn test_invalid_range_is_rejected() {
        assert!(matches!(
            SceneConfig::from_ron_str("(min_scale: 2.0, max_scale: 1.0)"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("vpe_scene_config_{}.ron", std::process::id()));
        let config = SceneConfig::default();
        config.save(&path).unwrap();
        let loaded = SceneConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
