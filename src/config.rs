//! Configuration management for the risk prediction console

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the serialized ONNX classifier
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_artifact_path() -> String {
    "model.onnx".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

/// Terminal display configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Use ANSI color for the risk verdict (red/green)
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_color() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration, falling back to built-in defaults when the
    /// config file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new("config/config.toml");
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                artifact_path: default_artifact_path(),
                onnx_threads: 1,
            },
            display: DisplayConfig { color: true },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model.artifact_path, "model.onnx");
        assert_eq!(config.model.onnx_threads, 1);
        assert!(config.display.color);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[model]\nartifact_path = \"artifacts/clf.onnx\"\nonnx_threads = 2\n\n\
             [display]\ncolor = false\n\n\
             [logging]\nlevel = \"debug\"\nformat = \"json\"\n"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.model.artifact_path, "artifacts/clf.onnx");
        assert_eq!(config.model.onnx_threads, 2);
        assert!(!config.display.color);
        assert_eq!(config.logging.level, "debug");
    }
}
