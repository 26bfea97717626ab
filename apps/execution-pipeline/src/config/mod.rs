//! Configuration module for the execution pipeline.
//!
//! Provides configuration loading, validation, and environment variable
//! interpolation for every pipeline stage and the venue transport.
//!
//! # Usage
//!
//! ```rust,ignore
//! use execution_pipeline::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("venue: {}", config.venue.base_url);
//! ```

mod observability;
mod pipeline;
mod reconciliation;
mod venue;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use observability::{LogFormat, MetricsSettings, ObservabilityConfig, OtelConfig};
pub use pipeline::{
    DisclaimersConfig, ExecutionConfig, InstrumentsConfig, PlacementConfig, PositionsConfig,
    PrecheckConfig,
};
pub use reconciliation::ReconciliationConfig;
pub use venue::{TransportConfig, VenueConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Venue connection.
    pub venue: VenueConfig,
    /// Transport retries and throttling.
    pub transport: TransportConfig,
    /// Instrument validation.
    pub instruments: InstrumentsConfig,
    /// Position guards.
    pub positions: PositionsConfig,
    /// Precheck retries.
    pub precheck: PrecheckConfig,
    /// Disclaimer resolution.
    pub disclaimers: DisclaimersConfig,
    /// Placement.
    pub placement: PlacementConfig,
    /// Reconciliation scan.
    pub reconciliation: ReconciliationConfig,
    /// Orchestration.
    pub execution: ExecutionConfig,
    /// Logging, tracing, and metrics.
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. An unset or empty
/// variable without a default becomes the empty string.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` naming the first invalid field.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.venue.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "venue.base_url must not be empty".to_string(),
        ));
    }

    if config.venue.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "venue.request_timeout_secs must be positive".to_string(),
        ));
    }

    let jitter = config.transport.jitter_factor;
    if !(0.0..=1.0).contains(&jitter) {
        return Err(ConfigError::ValidationError(
            "transport.jitter_factor must be between 0.0 and 1.0".to_string(),
        ));
    }

    if config.transport.max_backoff_ms < config.transport.min_backoff_ms {
        return Err(ConfigError::ValidationError(
            "transport.max_backoff_ms must be >= transport.min_backoff_ms".to_string(),
        ));
    }

    if config.reconciliation.scan_limit == 0 {
        return Err(ConfigError::ValidationError(
            "reconciliation.scan_limit must be positive".to_string(),
        ));
    }

    if config.execution.default_quantity <= rust_decimal::Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "execution.default_quantity must be positive".to_string(),
        ));
    }

    Ok(())
}
