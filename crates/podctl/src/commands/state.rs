//! Snapshot export and import, independent of the configured backend.

use std::path::Path;

use anyhow::bail;

use podgrid_persist::{JsonFileBackend, StateBackend};
use podgrid_state::ClusterState;

pub fn save(state: &ClusterState, path: &Path) -> anyhow::Result<String> {
    JsonFileBackend::new(path).save(state)?;
    Ok(format!("Saved cluster state to {}", path.display()))
}

/// Replace the current state with the snapshot at `path`.
pub fn load(state: &ClusterState, path: &Path) -> anyhow::Result<String> {
    if !path.is_file() {
        bail!("snapshot file {} does not exist", path.display());
    }
    let bytes = std::fs::read(path)?;
    state.restore(&bytes)?;
    Ok(format!(
        "Loaded cluster state from {} ({} nodes, {} pods)",
        path.display(),
        state.nodes().len(),
        state.pods().len()
    ))
}
