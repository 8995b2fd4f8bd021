//! Flat-file backend: the snapshot as one pretty-printed JSON document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use podgrid_state::ClusterState;

use crate::backend::StateBackend;
use crate::error::{PersistError, PersistResult};

#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StateBackend for JsonFileBackend {
    fn load(&self) -> PersistResult<ClusterState> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot file, starting empty");
                return Ok(ClusterState::new());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        let state = ClusterState::from_bytes(&bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot loaded");
        Ok(state)
    }

    /// Writes to a sibling temp file and renames it into place.
    fn save(&self, state: &ClusterState) -> PersistResult<()> {
        let bytes = state.to_bytes()?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
