//! Loaded cluster state plus the backend it came from.

use anyhow::Context;
use tracing::debug;

use podgrid_persist::{StateBackend, open_backend};
use podgrid_state::ClusterState;

use crate::config::StateConfig;

pub struct Session {
    backend: Box<dyn StateBackend>,
    state: ClusterState,
}

impl Session {
    pub fn open(config: &StateConfig) -> anyhow::Result<Self> {
        let backend = open_backend(config.backend, &config.path)
            .with_context(|| format!("opening {} state at {}", config.backend, config.path.display()))?;
        Self::from_backend(backend)
    }

    pub fn from_backend(backend: Box<dyn StateBackend>) -> anyhow::Result<Self> {
        let state = backend
            .load()
            .with_context(|| format!("loading state from {}", backend.describe()))?;
        debug!(backend = %backend.describe(), "session opened");
        Ok(Self { backend, state })
    }

    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.backend
            .save(&self.state)
            .with_context(|| format!("saving state to {}", self.backend.describe()))
    }
}
