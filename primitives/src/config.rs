use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BigNum, ValidatorId};

pub static DEVELOPMENT_CONFIG: Lazy<Config> = Lazy::new(|| {
    toml::from_str(include_str!("../../docs/config/dev.toml"))
        .expect("Failed to parse dev.toml config file")
});

pub static PRODUCTION_CONFIG: Lazy<Config> = Lazy::new(|| {
    toml::from_str(include_str!("../../docs/config/prod.toml"))
        .expect("Failed to parse prod.toml config file")
});

/// Process-wide configuration. Loaded once at start-up and threaded
/// through constructors as an immutable value.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Threshold above which a cycle logs a channel-limit warning
    pub max_channels: u32,
    /// Page size used when listing channels from the sentry
    pub channels_find_limit: u32,
    /// Milliseconds between two tick cycles
    pub wait_time: u32,
    /// Milliseconds of Heartbeat silence before a new one is emitted
    pub heartbeat_time: u32,
    /// 0 - 1000; an ApproveState reports `isHealthy` when the approved
    /// promilles of our balance total reach this threshold
    pub health_threshold_promilles: u32,
    /// Milliseconds a single channel tick may take before it is abandoned
    pub validator_tick_timeout: u32,
    /// Milliseconds for the channel list request
    pub list_timeout: u32,
    /// Milliseconds for any other sentry fetch
    pub fetch_timeout: u32,
    /// Milliseconds for propagating a message to a peer validator
    pub propagation_timeout: u32,
    #[serde(default)]
    pub creators_whitelist: Vec<ValidatorId>,
    #[serde(default)]
    pub validators_whitelist: Vec<ValidatorId>,
    #[serde(default)]
    pub token_address_whitelist: Vec<String>,
    pub minimal_deposit: BigNum,
    pub minimal_fee: BigNum,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Toml parsing: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("File reading: {0}")]
    InvalidFile(#[from] std::io::Error),
}

/// Loads the configuration for the given environment ("production" or
/// anything else for development), unless an explicit TOML file path
/// overrides it.
pub fn configuration(environment: &str, config_file: Option<&str>) -> Result<Config, ConfigError> {
    match config_file {
        Some(config_file) => {
            let content = std::fs::read_to_string(config_file)?;

            Ok(toml::from_str(&content)?)
        }
        None => {
            if environment == "production" {
                Ok(PRODUCTION_CONFIG.clone())
            } else {
                Ok(DEVELOPMENT_CONFIG.clone())
            }
        }
    }
}
