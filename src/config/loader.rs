//! Configuration loading from the environment.

use std::num::ParseIntError;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid LOG_FORMAT {0:?}: expected \"text\" or \"json\"")]
    InvalidLogFormat(String),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the process environment.
///
/// Reads `PORT`, `LOG_LEVEL` and `LOG_FORMAT`; everything else keeps its
/// default.
pub fn from_env() -> Result<ServiceConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load and validate configuration from an arbitrary variable lookup.
///
/// Empty values are treated as unset.
pub fn from_lookup<F>(lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut config = ServiceConfig::default();

    if let Some(port) = get("PORT") {
        config.listener.port = port.trim().parse().map_err(|source| ConfigError::InvalidPort {
            value: port.clone(),
            source,
        })?;
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = get("LOG_FORMAT") {
        config.logging.format = format.parse().map_err(ConfigError::InvalidLogFormat)?;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
