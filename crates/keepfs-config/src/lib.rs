mod credentials;
mod env;
pub mod types;
mod validation;

use std::path::Path;

pub use credentials::{expand_home, Credentials, PASSWORD_ENV, USER_ENV};
pub use env::interpolate_env;
pub use types::*;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("No credentials found. Pass --credentials FILE or set GOOGLE_KEEP_USER and GOOGLE_KEEP_PASSWORD.")]
    MissingCredentials,

    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl KeepFsConfig {
    /// Parse a configuration from a YAML string.
    /// Environment variables in the format `${VAR_NAME}` will be interpolated.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let interpolated = env::interpolate_env(yaml)?;
        let config: KeepFsConfig = serde_yaml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Load a configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Render the configuration back to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
