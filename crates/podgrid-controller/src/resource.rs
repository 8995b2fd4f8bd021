//! Resource usage reporting across nodes.

use serde::Serialize;

use podgrid_state::ClusterState;

/// Used vs. capacity for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeResourceRow {
    pub name: String,
    pub cpu_used: u64,
    pub cpu_capacity: u64,
    pub mem_used: u64,
    pub mem_capacity: u64,
}

/// Totals over every node in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterCapacity {
    pub cpu_used: u64,
    pub cpu_total: u64,
    pub mem_used: u64,
    pub mem_total: u64,
}

/// One row per node, sorted by name.
pub fn node_resource_table(state: &ClusterState) -> Vec<NodeResourceRow> {
    state
        .nodes()
        .into_iter()
        .map(|n| NodeResourceRow {
            name: n.name,
            cpu_used: n.cpu_allocated,
            cpu_capacity: n.cpu_capacity,
            mem_used: n.mem_allocated,
            mem_capacity: n.mem_capacity,
        })
        .collect()
}

pub fn cluster_capacity(state: &ClusterState) -> ClusterCapacity {
    state
        .nodes()
        .iter()
        .fold(ClusterCapacity::default(), |mut acc, n| {
            acc.cpu_used += n.cpu_allocated;
            acc.cpu_total += n.cpu_capacity;
            acc.mem_used += n.mem_allocated;
            acc.mem_total += n.mem_capacity;
            acc
        })
}
