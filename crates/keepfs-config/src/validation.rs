use crate::types::KeepFsConfig;
use crate::ConfigError;

impl KeepFsConfig {
    /// Validate the configuration and return a list of errors.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(ref endpoint) = self.service.endpoint {
            if endpoint.trim().is_empty() {
                errors.push(ConfigError::InvalidConfig(
                    "service.endpoint must not be empty; omit it to use an in-memory store"
                        .to_string(),
                ));
            } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                errors.push(ConfigError::InvalidConfig(format!(
                    "service.endpoint '{}' must be an http:// or https:// URL",
                    endpoint
                )));
            }
        }

        if self.service.timeout_secs == 0 {
            errors.push(ConfigError::InvalidConfig(
                "service.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.mount.fs_name.trim().is_empty() {
            errors.push(ConfigError::InvalidConfig(
                "mount.fs_name must not be empty".to_string(),
            ));
        }

        if let Some(ref creds) = self.credentials {
            if creds.user.is_some() != creds.password.is_some() {
                errors.push(ConfigError::InvalidConfig(
                    "credentials.user and credentials.password must be set together".to_string(),
                ));
            }
        }

        errors
    }

    /// Validate and return Ok(()) if valid, or Err with the first error.
    pub fn validate_or_err(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}
