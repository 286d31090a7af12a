//! Builds the note service a command runs against.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use keepfs_config::{Credentials, KeepFsConfig};
use keepfs_core::{HttpNoteService, MemoryNoteService, NoteService};
use keepfs_fuse::{init_runtime, NoteStoreAdapter};
use tracing::info;

use crate::errors::CliError;

/// Connection flags taken from the command line.
#[derive(Debug, Default)]
pub struct ConnectOptions {
    pub credentials: Option<PathBuf>,
    pub memory: bool,
}

/// Create the service and log in.
///
/// `--memory` selects an empty in-memory store and needs no credentials.
/// Otherwise `service.endpoint` must be configured.
pub fn connect(
    config: &KeepFsConfig,
    options: &ConnectOptions,
) -> Result<Arc<dyn NoteService>, Box<dyn std::error::Error>> {
    if options.memory {
        info!("using in-memory note store, changes are lost on exit");
        return Ok(Arc::new(MemoryNoteService::new()));
    }
    let endpoint = config.service.endpoint.as_ref().ok_or_else(|| {
        CliError::Usage("no service endpoint configured, set service.endpoint or pass --memory".to_string())
    })?;

    let credentials = Credentials::resolve(options.credentials.as_deref(), config.credentials.as_ref())
        .map_err(|e| CliError::Usage(e.to_string()))?;

    init_runtime()?;
    let service: Arc<dyn NoteService> = Arc::new(HttpNoteService::new(
        endpoint,
        Duration::from_secs(config.service.timeout_secs),
    )?);

    NoteStoreAdapter::new(service.clone())
        .login(&credentials.user, &credentials.password)
        .map_err(|e| CliError::Usage(format!("login as {} failed: {}", credentials.user, e)))?;
    info!("logged in to {} as {}", endpoint, credentials.user);

    Ok(service)
}
