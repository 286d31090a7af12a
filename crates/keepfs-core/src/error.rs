/// Errors that can occur in note service operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No note with the given id.
    #[error("Note not found: {0}")]
    NotFound(String),

    /// The remote service could not be reached or answered with a server error.
    #[error("Note service unavailable: {0}")]
    RemoteUnavailable(String),

    /// The session token is no longer accepted.
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Login was rejected.
    #[error("Login failed for user '{0}'")]
    AuthFailed(String),

    /// The service answered with something we could not understand.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Other service-specific error.
    #[error("Note service error: {0}")]
    Other(String),
}

impl StoreError {
    /// Returns true if this error is transient and the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::RemoteUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_unavailable_is_transient() {
        assert!(StoreError::RemoteUnavailable("down".to_string()).is_transient());
    }

    #[test]
    fn test_auth_errors_not_transient() {
        assert!(!StoreError::AuthExpired("token".to_string()).is_transient());
        assert!(!StoreError::AuthFailed("alice".to_string()).is_transient());
    }

    #[test]
    fn test_display_includes_context() {
        let err = StoreError::NotFound("n42".to_string());
        assert!(err.to_string().contains("n42"));

        let err = StoreError::AuthFailed("alice".to_string());
        assert!(err.to_string().contains("alice"));
    }
}
