//! Whole-state snapshot exchanged with persistence backends.
//!
//! A snapshot carries every collection plus the two monotonic counters,
//! so a restored store never reissues a pod uid or virtual IP.

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::types::*;

/// Serializable image of a `ClusterState`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
    /// Last pod uid handed out.
    #[serde(default)]
    pub pod_uid_counter: u64,
    /// Offset of the next virtual IP to allocate.
    #[serde(default = "first_vip_offset")]
    pub vip_counter: u32,
}

pub(crate) fn first_vip_offset() -> u32 {
    1
}

impl ClusterSnapshot {
    /// Encode as pretty-printed JSON bytes.
    pub fn to_bytes(&self) -> ClusterResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| ClusterError::Snapshot(e.to_string()))
    }

    /// Decode from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> ClusterResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ClusterError::Snapshot(e.to_string()))
    }
}
