//! The persistence contract shared by every backend.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use podgrid_state::ClusterState;

use crate::error::{PersistError, PersistResult};
use crate::json_file::JsonFileBackend;
use crate::redb_store::RedbBackend;

/// Somewhere a cluster snapshot can be loaded from and saved to.
///
/// `load` on a backend that has never been saved to yields an empty store.
pub trait StateBackend: Send + Sync {
    fn load(&self) -> PersistResult<ClusterState>;

    fn save(&self, state: &ClusterState) -> PersistResult<()>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Which backend a path refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Redb,
    Json,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Redb => write!(f, "redb"),
            BackendKind::Json => write!(f, "json"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redb" => Ok(BackendKind::Redb),
            "json" => Ok(BackendKind::Json),
            other => Err(PersistError::UnknownBackend(other.to_string())),
        }
    }
}

/// Open the backend of the given kind at `path`.
pub fn open_backend(kind: BackendKind, path: &Path) -> PersistResult<Box<dyn StateBackend>> {
    Ok(match kind {
        BackendKind::Redb => Box::new(RedbBackend::open(path)?),
        BackendKind::Json => Box::new(JsonFileBackend::new(path)),
    })
}
