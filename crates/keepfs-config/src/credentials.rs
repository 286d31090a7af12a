//! Account credential resolution.
//!
//! Credentials come from, in order: an explicit file, the config file's
//! `credentials` section, or the `GOOGLE_KEEP_USER` / `GOOGLE_KEEP_PASSWORD`
//! environment variables.

use std::env;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::types::CredentialsConfig;
use crate::ConfigError;

/// Environment variable holding the account user name.
pub const USER_ENV: &str = "GOOGLE_KEEP_USER";

/// Environment variable holding the account password.
pub const PASSWORD_ENV: &str = "GOOGLE_KEEP_PASSWORD";

/// A user name and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Parse `"<user> <password>"`. Surrounding whitespace and a trailing
    /// newline are ignored; the password is everything after the first run
    /// of whitespace.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let trimmed = content.trim();
        let (user, password) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| {
                ConfigError::MalformedCredentials("expected \"<user> <password>\"".to_string())
            })?;
        let password = password.trim_start();
        if user.is_empty() || password.is_empty() {
            return Err(ConfigError::MalformedCredentials(
                "user and password must both be non-empty".to_string(),
            ));
        }
        Ok(Credentials {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    /// Read credentials from a file. A leading `~` is the home directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(expand_home(path))?;
        Self::parse(&content)
    }

    /// Read credentials from the environment, if both variables are set.
    pub fn from_env() -> Option<Self> {
        let user = env::var(USER_ENV).ok()?;
        let password = env::var(PASSWORD_ENV).ok()?;
        if user.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credentials { user, password })
    }

    /// Resolve credentials using the documented precedence.
    pub fn resolve(
        explicit_file: Option<&Path>,
        config: Option<&CredentialsConfig>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_file {
            return Self::from_file(path);
        }

        if let Some(config) = config {
            if let Some(ref path) = config.file {
                return Self::from_file(path);
            }
            if let (Some(user), Some(password)) = (&config.user, &config.password) {
                if !user.is_empty() && !password.is_empty() {
                    return Ok(Credentials {
                        user: user.clone(),
                        password: password.clone(),
                    });
                }
            }
        }

        Self::from_env().ok_or(ConfigError::MissingCredentials)
    }
}

/// Replace a leading `~` component with the user's home directory.
/// `~user` forms and paths without a home directory are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match (components.next(), dirs_next::home_dir()) {
        (Some(Component::Normal(first)), Some(home)) if first == "~" => home.join(components.as_path()),
        _ => path.to_path_buf(),
    }
}
