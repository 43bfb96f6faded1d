//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{ClientPoolConfig, ServerPoolConfig};
use crate::config::validation::{
    validate_client_config, validate_server_config, ValidatedClientConfig, ValidatedServerConfig,
};
use crate::error::ConfigError;

/// Load and validate a client pool's configuration from a TOML file.
pub fn load_client_config(path: &Path) -> Result<ValidatedClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ClientPoolConfig = toml::from_str(&content)?;
    Ok(validate_client_config(&config))
}

/// Load and validate a server pool's configuration from a TOML file.
pub fn load_server_config(path: &Path) -> Result<ValidatedServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServerPoolConfig = toml::from_str(&content)?;
    Ok(validate_server_config(&config))
}
