//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub slicing: SlicingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicingConfig {
    /// Fallback directory for relative model paths
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Where section images are written; served under `/slices`
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Section extent around each locator, in model units (mm)
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            radius: default_radius(),
            image_width: default_image_width(),
            image_height: default_image_height(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_output_dir() -> String {
    "./data/generated_slices".to_string()
}

fn default_radius() -> f64 {
    200.0
}

fn default_image_width() -> u32 {
    800
}

fn default_image_height() -> u32 {
    600
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("weldmap-slicer.toml")).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert!(config.server.tls.is_none());
        assert_eq!(config.slicing.radius, 200.0);
        assert_eq!((config.slicing.image_width, config.slicing.image_height), (800, 600));
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [slicing]
            data_dir = "/srv/models"
            radius = 50.0
            "#,
        )
        .unwrap();
        assert_eq!(config.slicing.data_dir, "/srv/models");
        assert_eq!(config.slicing.radius, 50.0);
        assert_eq!(config.slicing.output_dir, "./data/generated_slices");
        assert_eq!(config.server.bind, "0.0.0.0:5000");
    }

    #[test]
    fn test_tls_section() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:8443"
            tls = { cert = "cert.pem", key = "key.pem" }
            "#,
        )
        .unwrap();
        let tls = config.server.tls.unwrap();
        assert_eq!(tls.cert, "cert.pem");
        assert_eq!(tls.key, "key.pem");
    }
}
