#![deny(warnings)]

//! YAML loading for the economy's tunables.
//!
//! A config file may set any subset of [`EconomyConfig`]'s fields; the rest
//! keep their defaults. Every loaded config is validated before use.

use fuel_core::{validate_config, EconomyConfig, ValidationError};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Parse and validate a YAML document.
pub fn parse_config(text: &str) -> Result<EconomyConfig, ConfigError> {
    let cfg: EconomyConfig = if text.trim().is_empty() {
        EconomyConfig::default()
    } else {
        serde_yaml::from_str(text)?
    };
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Load the config at `path`. A missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EconomyConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "no economy config, using defaults");
        return Ok(EconomyConfig::default());
    }
    let text = fs::read_to_string(path)?;
    let cfg = parse_config(&text)?;
    info!(path = %path.display(), "economy config loaded");
    Ok(cfg)
}

/// Render a config as YAML, e.g. to seed an editable file.
pub fn to_yaml(cfg: &EconomyConfig) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}
