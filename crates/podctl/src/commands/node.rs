use tabled::Tabled;

use podgrid_controller::{drain_node, join_node};
use podgrid_state::{ClusterState, Node};

use crate::labels::{format_labels, parse_labels};
use crate::output::{OutputFormat, render_list, render_value};

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "MEMORY")]
    mem: String,
    #[tabled(rename = "READY")]
    ready: bool,
    #[tabled(rename = "LABELS")]
    labels: String,
}

impl From<Node> for NodeRow {
    fn from(n: Node) -> Self {
        Self {
            name: n.name.clone(),
            cpu: format!("{}/{}", n.cpu_allocated, n.cpu_capacity),
            mem: format!("{}/{}", n.mem_allocated, n.mem_capacity),
            ready: n.is_schedulable(),
            labels: format_labels(&n.labels),
        }
    }
}

/// Register a node; Pending pods are placed onto it straight away.
pub fn add(
    state: &ClusterState,
    name: &str,
    cpu: u64,
    mem: u64,
    labels: &str,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let node = Node::new(name, cpu, mem).with_labels(parse_labels(labels)?);
    let report = join_node(state, node.clone())?;
    let node = state.get_node(name).unwrap_or(node);
    let mut text = format!("Added node {name}");
    if !report.bound.is_empty() {
        text.push_str(&format!(" ({} pending pods scheduled)", report.bound.len()));
    }
    render_value(&node, format, text)
}

pub fn list(state: &ClusterState, format: OutputFormat) -> anyhow::Result<String> {
    render_list(state.nodes(), format, "No nodes present", NodeRow::from)
}

pub fn remove(state: &ClusterState, name: &str, format: OutputFormat) -> anyhow::Result<String> {
    let detached = drain_node(state, name)?;
    let text = format!("Removed node {name} ({} pods detached)", detached.len());
    render_value(&detached, format, text)
}
