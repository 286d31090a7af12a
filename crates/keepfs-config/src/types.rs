use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level keepfs configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepFsConfig {
    /// Remote note service settings.
    pub service: ServiceConfig,
    /// Where to find the account credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsConfig>,
    /// FUSE mount settings.
    pub mount: MountConfig,
}

/// Remote note service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the note service API. `None` means an in-memory store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

/// Credential sources. A file takes precedence over inline values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// File containing `"<user> <password>"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// FUSE mount settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Filesystem name reported to the kernel.
    pub fs_name: String,
    /// Reject every mutating operation with EACCES.
    pub read_only: bool,
    /// Unmount automatically when the process exits.
    pub auto_unmount: bool,
    /// Let other users access the mount.
    pub allow_other: bool,
    /// Kernel attribute/entry cache lifetime.
    pub attr_ttl_secs: u64,
}

impl Default for MountConfig {
    fn default() -> Self {
        MountConfig {
            fs_name: "keepfs".to_string(),
            read_only: false,
            auto_unmount: true,
            allow_other: false,
            attr_ttl_secs: 1,
        }
    }
}
