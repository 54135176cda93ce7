//! Security-specific error types.

use thiserror::Error;

/// Failures reported by a policy service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The policy service refused to compute permissions for the caller.
    #[error("policy rejected request for {entity}: {reason}")]
    Rejected {
        /// Entity the permissions were requested for.
        entity: String,
        /// Reason reported by the service.
        reason: String,
    },

    /// The policy service could not be reached or failed internally.
    #[error("policy service unavailable: {0}")]
    Unavailable(String),
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PolicyError::Rejected {
            entity: "users".to_string(),
            reason: "session expired".to_string(),
        };
        assert!(err.to_string().contains("users"));
        assert!(err.to_string().contains("session expired"));

        let err = PolicyError::Unavailable("timeout".into());
        assert_eq!(err.to_string(), "policy service unavailable: timeout");
    }
}
