//! Error types for the podgrid cluster state.

use thiserror::Error;

/// Result type alias for cluster state operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors returned by store, controller, and service operations.
///
/// All of these are recoverable; callers surface them verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("node {node} lacks resources for pod {pod}")]
    InsufficientResources { pod: String, node: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("service {0} has no ready pods")]
    NoReadyPods(String),

    #[error("virtual IP range {0} exhausted")]
    VipExhausted(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl ClusterError {
    pub fn not_found(kind: &'static str, name: impl ToString) -> Self {
        ClusterError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, name: impl ToString) -> Self {
        ClusterError::AlreadyExists {
            kind,
            name: name.to_string(),
        }
    }
}
