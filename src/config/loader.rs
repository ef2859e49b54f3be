//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RevealConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the primary node endpoint.
pub const RPC_URL_ENV: &str = "RPC_URL";

/// Overrides the signing key handle.
pub const KEY_SOURCE_ENV: &str = "KMS_KEY_SOURCE";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    /// A setting the requested command needs is absent.
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Missing(field) => write!(f, "Missing setting: {}", field),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values given on the command line. They win over the file and the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub key_handle: Option<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut RevealConfig) {
        if let Some(url) = &self.rpc_url {
            config.node.rpc_url = url.clone();
        }
        if let Some(handle) = &self.key_handle {
            config.signer.key_handle = Some(handle.clone());
        }
    }
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
///
/// Without a path the defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<RevealConfig, ConfigError> {
    load_config_with(path, &ConfigOverrides::default())
}

/// Like [`load_config`], with command line values applied last. Validation
/// runs once, on the merged result.
pub fn load_config_with(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<RevealConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => RevealConfig::default(),
    };
    finish(config, |name| std::env::var(name).ok(), overrides)
}

/// Parse configuration from a TOML string. Environment overrides are read
/// through `env` so callers control what is visible.
pub fn load_config_str(
    content: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RevealConfig, ConfigError> {
    load_config_str_with(content, env, &ConfigOverrides::default())
}

pub fn load_config_str_with(
    content: &str,
    env: impl Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<RevealConfig, ConfigError> {
    let config: RevealConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    finish(config, env, overrides)
}

fn finish(
    mut config: RevealConfig,
    env: impl Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<RevealConfig, ConfigError> {
    apply_env_overrides(&mut config, env);
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `RPC_URL` and `KMS_KEY_SOURCE`. Empty values are ignored.
pub fn apply_env_overrides(config: &mut RevealConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env(RPC_URL_ENV).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(rpc_url = %url, "node endpoint overridden from environment");
        config.node.rpc_url = url;
    }
    if let Some(handle) = env(KEY_SOURCE_ENV).filter(|v| !v.trim().is_empty()) {
        tracing::debug!(key_handle = %handle, "key handle overridden from environment");
        config.signer.key_handle = Some(handle);
    }
}
