use serde::Serialize;
use tabled::Tabled;

use podgrid_controller::{ClusterCapacity, NodeResourceRow, cluster_capacity, node_resource_table};
use podgrid_state::{ClusterState, PodPhase};

use crate::output::{OutputFormat, render_list};

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CPU_USED")]
    cpu_used: u64,
    #[tabled(rename = "CPU_CAPACITY")]
    cpu_capacity: u64,
    #[tabled(rename = "MEM_USED")]
    mem_used: u64,
    #[tabled(rename = "MEM_CAPACITY")]
    mem_capacity: u64,
}

impl From<NodeResourceRow> for UsageRow {
    fn from(r: NodeResourceRow) -> Self {
        Self {
            name: r.name,
            cpu_used: r.cpu_used,
            cpu_capacity: r.cpu_capacity,
            mem_used: r.mem_used,
            mem_capacity: r.mem_capacity,
        }
    }
}

#[derive(Serialize)]
struct Status {
    nodes: Vec<NodeResourceRow>,
    capacity: ClusterCapacity,
    pods: PhaseCounts,
}

#[derive(Serialize, Default)]
struct PhaseCounts {
    pending: usize,
    running: usize,
    failed: usize,
}

/// Per-node usage, cluster totals, and pod phase counts.
pub fn show(state: &ClusterState, format: OutputFormat) -> anyhow::Result<String> {
    let nodes = node_resource_table(state);
    let capacity = cluster_capacity(state);
    let pods = state
        .pods()
        .iter()
        .fold(PhaseCounts::default(), |mut acc, p| {
            match p.status.phase {
                PodPhase::Pending => acc.pending += 1,
                PodPhase::Running => acc.running += 1,
                PodPhase::Failed => acc.failed += 1,
            }
            acc
        });

    if format == OutputFormat::Json {
        let status = Status { nodes, capacity, pods };
        return Ok(serde_json::to_string_pretty(&status)?);
    }

    let table = render_list(nodes, format, "No nodes present", UsageRow::from)?;
    Ok(format!(
        "{table}\n\nCPU: {}/{}, Mem: {}/{}\nPods: {} running, {} pending, {} failed",
        capacity.cpu_used,
        capacity.cpu_total,
        capacity.mem_used,
        capacity.mem_total,
        pods.running,
        pods.pending,
        pods.failed
    ))
}
