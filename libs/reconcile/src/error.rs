//! Reconciliation errors.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Step of a reconcile invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Fetching,
    Resolving,
    Deciding,
    Patching,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetching => "fetching",
            Self::Resolving => "resolving",
            Self::Deciding => "deciding",
            Self::Patching => "patching",
        };
        f.write_str(s)
    }
}

/// Errors that end a reconcile invocation.
///
/// Every variant asks the caller to requeue; the engine never retries itself.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading the node failed.
    #[error("failed to fetch node {node}: {message}")]
    Fetch { node: String, message: String },

    /// Submitting the patch failed.
    #[error("failed to patch node {node}: {message}")]
    Submit { node: String, message: String },

    /// Concurrent modification detected on submit.
    #[error("conflict patching node {node}: {message}")]
    Conflict { node: String, message: String },

    /// A call outlived the request deadline.
    #[error("timeout after {elapsed:?} while {phase}")]
    Timeout {
        phase: ReconcilePhase,
        elapsed: Duration,
    },

    /// The patch document could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ReconcileError {
    /// Whether retrying with fresh state can succeed.
    ///
    /// Serialization failures repeat with the same inputs.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        let conflict = ReconcileError::Conflict {
            node: "n1".to_string(),
            message: "resourceVersion changed".to_string(),
        };
        assert!(conflict.is_retryable());
        assert!(!ReconcileError::Serialization("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        let err = ReconcileError::Timeout {
            phase: ReconcilePhase::Patching,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(err.to_string(), "timeout after 1s while patching");
    }
}
