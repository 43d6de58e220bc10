//! Viewer configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default configuration file for the native viewer
pub const CONFIG_FILE: &str = "weldmap.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Base URL of the cross-section service
    #[serde(default = "default_section_url")]
    pub section_url: String,
    /// Process tag given to new entities when no filter is active
    #[serde(default)]
    pub default_process: String,
    /// Marker size in model units
    #[serde(default = "default_marker_scale")]
    pub marker_scale: f32,
    /// How far in front of the camera new entities are placed
    #[serde(default = "default_add_distance")]
    pub add_distance: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            section_url: default_section_url(),
            default_process: String::new(),
            marker_scale: default_marker_scale(),
            add_distance: default_add_distance(),
        }
    }
}

fn default_section_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_marker_scale() -> f32 {
    10.0
}

fn default_add_distance() -> f32 {
    300.0
}

impl ViewerConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `section_url` with its `/slice` endpoint
    pub fn slice_endpoint(&self) -> String {
        format!("{}/slice", self.section_url.trim_end_matches('/'))
    }
}

/// Load configuration from file, falling back to defaults when it is absent
pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = ViewerConfig::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ViewerConfig::default())
    }
}
