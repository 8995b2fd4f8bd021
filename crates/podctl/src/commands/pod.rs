use tabled::Tabled;

use anyhow::Context;
use serde::Serialize;

use podgrid_controller::{create_pod, delete_pod, health_check_pod, restart_pod};
use podgrid_scheduler::{check_node, rank_nodes};
use podgrid_state::{ClusterState, HealthCheck, Pod, PodSpec, PodUid, RestartPolicy};

use crate::labels::{format_labels, parse_labels};
use crate::output::{OutputFormat, render_list, render_rows, render_value};

#[derive(Tabled)]
struct PodRow {
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "IMAGE")]
    image: String,
    #[tabled(rename = "PHASE")]
    phase: String,
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "CPU")]
    cpu: u64,
    #[tabled(rename = "MEM")]
    mem: u64,
    #[tabled(rename = "RESTARTS")]
    restarts: u32,
    #[tabled(rename = "HEALTHY")]
    healthy: bool,
    #[tabled(rename = "LABELS")]
    labels: String,
}

impl From<Pod> for PodRow {
    fn from(p: Pod) -> Self {
        Self {
            uid: p.uid.to_string(),
            name: p.name,
            image: p.spec.image,
            phase: p.status.phase.to_string(),
            node: p.status.node_name.unwrap_or_else(|| "-".to_string()),
            cpu: p.spec.cpu_request,
            mem: p.spec.mem_request,
            restarts: p.status.restart_count,
            healthy: p.status.healthy,
            labels: format_labels(&p.spec.labels),
        }
    }
}

/// Flags for `pod create`.
#[derive(Debug, Clone)]
pub struct CreatePod {
    pub name: String,
    pub image: String,
    pub cpu: u64,
    pub mem: u64,
    pub labels: String,
    pub restart_policy: RestartPolicy,
    pub health_check: bool,
}

pub fn create(state: &ClusterState, args: CreatePod, format: OutputFormat) -> anyhow::Result<String> {
    let health_check = HealthCheck {
        enabled: args.health_check,
        ..HealthCheck::default()
    };
    let spec = PodSpec::new(args.name, args.image, args.cpu, args.mem)
        .with_labels(parse_labels(&args.labels)?)
        .with_restart_policy(args.restart_policy)
        .with_health_check(health_check);
    let pod = create_pod(state, spec);

    let mut text = format!("Created pod {} -> {}", pod.uid, pod.status.phase);
    if !pod.status.message.is_empty() {
        text.push_str(&format!(" ({})", pod.status.message));
    }
    render_value(&pod, format, text)
}

pub fn list(state: &ClusterState, format: OutputFormat) -> anyhow::Result<String> {
    render_list(state.pods(), format, "No pods present", PodRow::from)
}

pub fn delete(state: &ClusterState, uid: PodUid, format: OutputFormat) -> anyhow::Result<String> {
    let pod = delete_pod(state, uid)?;
    render_value(&pod, format, format!("Deleted pod {uid}"))
}

pub fn health(state: &ClusterState, uid: PodUid, format: OutputFormat) -> anyhow::Result<String> {
    let pod = health_check_pod(state, uid)?;
    render_value(&pod, format, format!("Pod {uid} is healthy"))
}

pub fn restart(state: &ClusterState, uid: PodUid, format: OutputFormat) -> anyhow::Result<String> {
    let pod = restart_pod(state, uid)?;
    let text = format!(
        "Restarted pod {uid} as {} -> {} (restarts: {})",
        pod.uid, pod.status.phase, pod.status.restart_count
    );
    render_value(&pod, format, text)
}

#[derive(Serialize, Tabled)]
struct Placement {
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "RANK")]
    rank: String,
    #[tabled(rename = "REASON")]
    reason: String,
}

/// Show how each node would be judged for the pod's request right now.
pub fn explain(state: &ClusterState, uid: PodUid, format: OutputFormat) -> anyhow::Result<String> {
    let pod = state.get_pod(uid).with_context(|| format!("pod {uid} not found"))?;
    let nodes = state.nodes();
    let ranked: Vec<&str> = rank_nodes(&nodes, &pod).iter().map(|n| n.name.as_str()).collect();

    let placements: Vec<Placement> = nodes
        .iter()
        .map(|n| match check_node(n, &pod) {
            Ok(()) => Placement {
                node: n.name.clone(),
                rank: ranked
                    .iter()
                    .position(|name| *name == n.name)
                    .map_or_else(|| "-".to_string(), |i| (i + 1).to_string()),
                reason: "eligible".to_string(),
            },
            Err(rejection) => Placement {
                node: n.name.clone(),
                rank: "-".to_string(),
                reason: rejection.to_string(),
            },
        })
        .collect();
    render_rows(&placements, format, "No nodes present")
}
