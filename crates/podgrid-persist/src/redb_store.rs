//! Embedded-database backend backed by redb.
//!
//! The whole snapshot lives under one key, so a save is a single write
//! transaction and readers never observe a half-written cluster.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};
use tracing::debug;

use podgrid_state::ClusterState;

use crate::backend::StateBackend;
use crate::error::{PersistError, PersistResult};

/// Serialized `ClusterSnapshot` documents keyed by name.
const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Key of the current cluster snapshot.
const CURRENT: &str = "current";

/// Convert any `Display` error into a `PersistError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| PersistError::$variant(e.to_string())
    };
}

#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: Option<PathBuf>,
}

impl RedbBackend {
    /// Open (or create) a database file at `path`.
    pub fn open(path: &Path) -> PersistResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let backend = Self {
            db: Arc::new(db),
            path: Some(path.to_path_buf()),
        };
        backend.ensure_tables()?;
        debug!(?path, "redb backend opened");
        Ok(backend)
    }

    /// Ephemeral database, for tests and the demo.
    pub fn open_in_memory() -> PersistResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let backend = Self {
            db: Arc::new(db),
            path: None,
        };
        backend.ensure_tables()?;
        debug!("in-memory redb backend opened");
        Ok(backend)
    }

    fn ensure_tables(&self) -> PersistResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl StateBackend for RedbBackend {
    fn load(&self) -> PersistResult<ClusterState> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
        match table.get(CURRENT).map_err(map_err!(Read))? {
            Some(guard) => {
                let state = ClusterState::from_bytes(guard.value())?;
                debug!(backend = %self.describe(), "snapshot loaded");
                Ok(state)
            }
            None => {
                debug!(backend = %self.describe(), "no snapshot stored, starting empty");
                Ok(ClusterState::new())
            }
        }
    }

    fn save(&self, state: &ClusterState) -> PersistResult<()> {
        let value = state.to_bytes()?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SNAPSHOTS).map_err(map_err!(Table))?;
            table
                .insert(CURRENT, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(backend = %self.describe(), bytes = value.len(), "snapshot saved");
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("redb:{}", path.display()),
            None => "redb:memory".to_string(),
        }
    }
}
