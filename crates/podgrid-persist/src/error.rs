//! Error types for podgrid persistence.

use thiserror::Error;

use podgrid_state::ClusterError;

/// Result type alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors raised while loading or saving cluster state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("unknown backend {0:?} (expected \"redb\" or \"json\")")]
    UnknownBackend(String),
}
