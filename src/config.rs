//! Configuration management for the revenue predictor

use crate::models::inference::GbdtParams;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub training: TrainingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted CSV upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Trained artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory holding the model and encoder files
    pub dir: String,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_ad_group_encoder_file")]
    pub ad_group_encoder_file: String,
    #[serde(default = "default_month_encoder_file")]
    pub month_encoder_file: String,
}

fn default_model_file() -> String {
    "revenue_model.json".to_string()
}

fn default_ad_group_encoder_file() -> String {
    "ad_group_encoder.json".to_string()
}

fn default_month_encoder_file() -> String {
    "month_encoder.json".to_string()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: "artifacts".to_string(),
            model_file: default_model_file(),
            ad_group_encoder_file: default_ad_group_encoder_file(),
            month_encoder_file: default_month_encoder_file(),
        }
    }
}

/// Training run parameters
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Boosting rounds
    pub iterations: usize,
    pub max_depth: u32,
    /// Learning rate
    pub shrinkage: f32,
    #[serde(default = "default_min_leaf_size")]
    pub min_leaf_size: usize,
    /// Fraction of rows held out for evaluation
    pub test_ratio: f64,
    /// Shuffle seed for the train/test split
    pub seed: u64,
}

fn default_min_leaf_size() -> usize {
    1
}

impl TrainingConfig {
    pub fn gbdt_params(&self) -> GbdtParams {
        GbdtParams {
            iterations: self.iterations,
            max_depth: self.max_depth,
            shrinkage: self.shrinkage,
            min_leaf_size: self.min_leaf_size,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let params = GbdtParams::default();
        Self {
            iterations: params.iterations,
            max_depth: params.max_depth,
            shrinkage: params.shrinkage,
            min_leaf_size: params.min_leaf_size,
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

/// Service metrics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summary log lines; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path.
    ///
    /// `REVENUE__SECTION__KEY` environment variables override file values,
    /// e.g. `REVENUE__SERVER__PORT=9000`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("REVENUE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_upload_bytes: default_max_upload_bytes(),
            },
            artifacts: ArtifactsConfig::default(),
            training: TrainingConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
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
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.artifacts.model_file, "revenue_model.json");
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.test_ratio, 0.2);
        assert_eq!(config.training.gbdt_params(), GbdtParams::default());
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[server]
host = "127.0.0.1"
port = 9100

[artifacts]
dir = "/var/lib/revenue"

[training]
iterations = 50
max_depth = 3
shrinkage = 0.05
test_ratio = 0.25
seed = 7

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.artifacts.dir, "/var/lib/revenue");
        assert_eq!(config.artifacts.month_encoder_file, "month_encoder.json");
        assert_eq!(config.training.iterations, 50);
        assert_eq!(config.training.min_leaf_size, 1);
        assert_eq!(config.metrics.report_interval_secs, 300);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_or_default("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8000);
    }
}
