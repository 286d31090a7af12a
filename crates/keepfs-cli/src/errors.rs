//! Error reporting for the command line.

use std::error::Error;

/// Errors that should be reported together with the usage line.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
}

/// Print an error and its chain of sources to stderr.
pub fn print_error(e: &(dyn Error + 'static)) {
    eprintln!("error: {}", e);
    let mut source = e.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
