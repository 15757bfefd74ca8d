//! Cache configuration module.
//!
//! Handles loading and validating `config.toml`. Every field has a serde
//! default, so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [derivatives]
//! format = "webp"           # "webp" or "avif"
//! quality = 80              # Lossy encoding quality (0-100)
//! # max_edge = 2560         # Downscale sources whose longer edge exceeds this
//!
//! [processing]
//! max_processes = 4         # Max parallel workers for warm-up (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! Quality lives here as a default only. Every cache call takes its quality
//! as an explicit argument; nothing reads this struct behind the caller's back.

use crate::imaging::{DerivativeFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up by [`load_config`].
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Derivative encoding settings (format, quality, size cap).
    pub derivatives: DerivativesConfig,
    /// Parallel warm-up settings.
    pub processing: ProcessingConfig,
}

impl CacheConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.derivatives.quality > 100 {
            return Err(ConfigError::Validation(
                "derivatives.quality must be 0-100".into(),
            ));
        }
        if self.derivatives.max_edge == Some(0) {
            return Err(ConfigError::Validation(
                "derivatives.max_edge must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Derivative encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Encoded format of every derivative.
    pub format: DerivativeFormat,
    /// Default encoding quality (0 = worst, 100 = best).
    pub quality: u32,
    /// Longest allowed edge in pixels. Absent means keep source dimensions.
    pub max_edge: Option<u32>,
}

impl DerivativesConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            format: DerivativeFormat::default(),
            quality: Quality::default().value(),
            max_edge: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel conversion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Parse `config.toml` contents and validate them.
///
/// Missing keys and sections take their defaults, so an empty string yields
/// [`CacheConfig::default`].
pub fn parse_config(content: &str) -> Result<CacheConfig, ConfigError> {
    let config: CacheConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Returns the defaults when no file exists. Unknown keys and out-of-range
/// values are errors.
pub fn load_config(dir: &Path) -> Result<CacheConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(CacheConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}
