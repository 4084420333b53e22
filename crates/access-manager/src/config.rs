//! Engine configuration: built-in defaults, an optional YAML overlay and
//! a `GEOGATE__`-prefixed environment overlay.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use geogate_rule_model::CatalogMode;

const ENV_PREFIX: &str = "GEOGATE__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Options recognized by the access engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Literal value of the instance dimension in every filter.
    pub instance_name: String,
    pub catalog_mode: CatalogMode,
    pub allow_remote_and_inline_layers: bool,
    pub allow_dynamic_styles: bool,
    pub cache_ttl_seconds: u64,
    pub cache_capacity: usize,
    /// Roles granting unrestricted access.
    pub admin_roles: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            instance_name: "default-gs".into(),
            catalog_mode: CatalogMode::Hide,
            allow_remote_and_inline_layers: false,
            allow_dynamic_styles: false,
            cache_ttl_seconds: 30,
            cache_capacity: 10_000,
            admin_roles: vec!["ROLE_ADMINISTRATOR".into()],
        }
    }
}

impl AccessConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Load the configuration cascade: defaults, then the YAML file when one
/// is given and exists, then environment variables.
pub fn load_config(path: Option<&Path>) -> Result<AccessConfig, ConfigError> {
    let mut config = AccessConfig::default();
    if let Some(path) = path {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
            config = serde_yaml::from_str(&content)
                .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        }
    }
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AccessConfig) -> Result<(), ConfigError> {
    for (key, raw) in env::vars() {
        let Some(field) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let field = field.to_ascii_lowercase();
        debug!(field = %field, "applying config override from the environment");
        match field.as_str() {
            "instance_name" => config.instance_name = raw,
            "catalog_mode" => config.catalog_mode = parse_catalog_mode(&raw)?,
            "allow_remote_and_inline_layers" => {
                config.allow_remote_and_inline_layers = parse_bool(&field, &raw)?;
            }
            "allow_dynamic_styles" => config.allow_dynamic_styles = parse_bool(&field, &raw)?,
            "cache_ttl_seconds" => config.cache_ttl_seconds = parse_number(&field, &raw)?,
            "cache_capacity" => config.cache_capacity = parse_number(&field, &raw)? as usize,
            "admin_roles" => {
                config.admin_roles = raw
                    .split(',')
                    .map(|role| role.trim().to_string())
                    .filter(|role| !role.is_empty())
                    .collect();
            }
            // Unrecognized keys belong to other components.
            _ => {}
        }
    }
    Ok(())
}

fn parse_bool(field: &str, raw: &str) -> Result<bool, ConfigError> {
    raw.parse::<bool>()
        .map_err(|_| ConfigError::Invalid(format!("{field}: expected a bool, got `{raw}`")))
}

fn parse_number(field: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|_| ConfigError::Invalid(format!("{field}: expected an integer, got `{raw}`")))
}

fn parse_catalog_mode(raw: &str) -> Result<CatalogMode, ConfigError> {
    match raw.to_ascii_uppercase().as_str() {
        "HIDE" => Ok(CatalogMode::Hide),
        "MIXED" => Ok(CatalogMode::Mixed),
        "CHALLENGE" => Ok(CatalogMode::Challenge),
        other => Err(ConfigError::Invalid(format!(
            "catalog_mode: unknown mode `{other}`"
        ))),
    }
}
