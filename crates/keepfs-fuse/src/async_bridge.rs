//! Process-wide tokio runtime that drives every `NoteService` call.
//!
//! `NoteStoreAdapter` is the only caller: each login, lookup, mutation and
//! sync it makes blocks the current thread (a `fuser` worker or the CLI main
//! thread) until the remote answers. The CLI never starts a runtime of its
//! own, so these calls are never nested inside one.

use std::future::Future;
use std::sync::OnceLock;

use keepfs_core::StoreError;
use tokio::runtime::{Builder, Runtime};

/// Built once on first use. A build failure is kept and reported to every
/// later caller.
static RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();

/// Build the note service runtime if needed. Called by `KeepFsCore`
/// constructors and by the CLI before it logs in.
pub fn init_runtime() -> Result<&'static Runtime, FuseError> {
    let result = RUNTIME.get_or_init(|| {
        Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("keepfs-worker")
            .enable_all()
            .build()
            .map_err(|e| e.to_string())
    });
    match result {
        Ok(rt) => Ok(rt),
        Err(e) => Err(FuseError::Runtime(format!(
            "cannot start note service runtime: {}",
            e
        ))),
    }
}

/// The note service runtime, if `init_runtime` has built it.
pub fn runtime() -> Result<&'static Runtime, FuseError> {
    match RUNTIME.get() {
        Some(Ok(rt)) => Ok(rt),
        Some(Err(e)) => Err(FuseError::Runtime(format!(
            "note service runtime failed to start: {}",
            e
        ))),
        None => Err(FuseError::Runtime(
            "note service runtime not started, call init_runtime first".to_string(),
        )),
    }
}

/// Wait for a note service future on the shared runtime.
///
/// Panics if called from inside another tokio runtime.
pub fn block_on<F, T>(future: F) -> Result<T, FuseError>
where
    F: Future<Output = T>,
{
    let rt = runtime()?;
    Ok(rt.block_on(future))
}

/// Result of a note service call made through `NoteStoreAdapter`.
pub type FuseResult<T> = Result<T, FuseError>;

/// Failure of a bridged note service call: either the runtime is missing
/// or the service itself returned an error.
#[derive(Debug, thiserror::Error)]
pub enum FuseError {
    /// The async runtime is unavailable.
    #[error("{0}")]
    Runtime(String),
    /// The note service failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_init_idempotent() {
        let rt1 = init_runtime().unwrap();
        let rt2 = init_runtime().unwrap();
        assert!(std::ptr::eq(rt1, rt2));
    }

    #[test]
    fn test_block_on_runs_timer() {
        init_runtime().unwrap();
        let result = block_on(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            "hello"
        })
        .unwrap();
        assert_eq!(result, "hello");
    }

    #[test]
    fn test_block_on_borrows_caller_state() {
        init_runtime().unwrap();
        let words = vec!["buy".to_string(), "milk".to_string()];
        let joined = block_on(async { words.join(" ") }).unwrap();
        assert_eq!(joined, "buy milk");
    }

    #[test]
    fn test_store_error_converts() {
        let err: FuseError = StoreError::RemoteUnavailable("down".to_string()).into();
        assert!(matches!(err, FuseError::Store(_)));
        assert!(err.to_string().contains("down"));
    }
}
