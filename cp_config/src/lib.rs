//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles exporter settings from defaults, an optional file and environment variables

use config::{Config as ConfigBuilder, Environment, File};
use cp_collector::descriptor::{is_valid_label_name, is_valid_metric_name};
use cp_collector::{CollectorOptions, LabelSet};
use cp_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub metrics: MetricsConfig,
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
    #[validate(nested)]
    pub demo: DemoPoolConfig,
}

/// Observability server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub obs_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            obs_port: 9000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.obs_port)
    }
}

/// Metric naming and constant labels
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct MetricsConfig {
    #[validate(custom(function = "validate_name_fragment"))]
    pub namespace: String,
    #[validate(custom(function = "validate_name_fragment"))]
    pub subsystem: String,
    /// Constant labels attached to every pool metric
    #[validate(custom(function = "validate_label_names"))]
    pub labels: BTreeMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "ch".to_string(),
            subsystem: "pool".to_string(),
            labels: BTreeMap::new(),
        }
    }
}

impl MetricsConfig {
    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            namespace: self.namespace.clone(),
            subsystem: self.subsystem.clone(),
            labels: LabelSet::from(self.labels.clone()),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `production` selects JSON log output
    #[validate(length(min = 1))]
    pub env: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
        }
    }
}

/// Demo pool driven by the binary
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct DemoPoolConfig {
    #[validate(range(min = 1, max = 1024))]
    pub max_resources: u32,
    #[validate(range(min = 1, max = 256))]
    pub workers: u32,
    /// How long a worker holds an acquired resource (milliseconds)
    #[validate(range(min = 1, max = 60000))]
    pub hold_ms: u64,
}

impl Default for DemoPoolConfig {
    fn default() -> Self {
        Self {
            max_resources: 8,
            workers: 12,
            hold_ms: 250,
        }
    }
}

/// Empty fragments are allowed and skipped when building names
fn validate_name_fragment(fragment: &str) -> std::result::Result<(), ValidationError> {
    if fragment.is_empty() || is_valid_metric_name(fragment) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_metric_name"))
    }
}

fn validate_label_names(
    labels: &BTreeMap<String, String>,
) -> std::result::Result<(), ValidationError> {
    match labels.keys().find(|name| !is_valid_label_name(name)) {
        Some(_) => Err(ValidationError::new("invalid_label_name")),
        None => Ok(()),
    }
}

impl Config {
    /// Load configuration from defaults, `chpool.toml` and `CHPOOL_*` variables
    pub fn load() -> Result<Self> {
        Self::load_from("chpool")
    }

    /// Load with an explicit config file stem; the file is optional
    pub fn load_from(file: &str) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // Set defaults first
        builder = builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.obs_port", 9000)?
            .set_default("metrics.namespace", "ch")?
            .set_default("metrics.subsystem", "pool")?
            .set_default("telemetry.env", "development")?
            .set_default("demo.max_resources", 8)?
            .set_default("demo.workers", 12)?
            .set_default("demo.hold_ms", 250)?;

        // Nested keys contain underscores, so map them explicitly
        if let Ok(obs_port) = std::env::var("CHPOOL_SERVER_OBS_PORT") {
            builder = builder.set_override("server.obs_port", obs_port)?;
        }
        if let Ok(max_resources) = std::env::var("CHPOOL_DEMO_MAX_RESOURCES") {
            builder = builder.set_override("demo.max_resources", max_resources)?;
        }
        if let Ok(hold_ms) = std::env::var("CHPOOL_DEMO_HOLD_MS") {
            builder = builder.set_override("demo.hold_ms", hold_ms)?;
        }

        builder = builder.add_source(File::with_name(file).required(false));

        // Load from environment variables with CHPOOL_ prefix (highest priority)
        builder = builder.add_source(
            Environment::with_prefix("CHPOOL")
                .try_parsing(true)
                .separator("_"),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed
            .validate()
            .map_err(|e| Error::Validation(format!("Config validation failed: {}", e)))?;

        Ok(parsed)
    }
}
