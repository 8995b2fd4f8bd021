//! A self-contained walkthrough on an in-memory cluster.

use std::fmt::Write;

use podgrid_controller::{cluster_capacity, create_deployment, create_service, node_resource_table, route_request};
use podgrid_state::{ClusterState, Deployment, Labels, Node};

pub fn run() -> anyhow::Result<String> {
    let state = ClusterState::new();
    state.add_node(Node::new("node-a", 4, 4096))?;
    state.add_node(Node::new("node-b", 2, 2048))?;

    let app = Labels::from([("app".to_string(), "web".to_string())]);
    create_deployment(
        &state,
        Deployment {
            name: "web".to_string(),
            image: "nginx:latest".to_string(),
            replicas: 3,
            selector: app.clone(),
            labels: app.clone(),
            cpu_request: 1,
            mem_request: 128,
        },
    )?;
    let svc = create_service(&state, "web", app, 80, 80)?;

    let mut out = String::new();
    writeln!(out, "=== Nodes ===")?;
    for row in node_resource_table(&state) {
        writeln!(
            out,
            "{}: CPU {}/{}, Mem {}/{}",
            row.name, row.cpu_used, row.cpu_capacity, row.mem_used, row.mem_capacity
        )?;
    }

    writeln!(out, "\n=== Pods ===")?;
    for pod in state.pods() {
        let node = pod.status.node_name.as_deref().unwrap_or("-");
        writeln!(out, "{}: {} on {} ({})", pod.uid, pod.name, node, pod.status.phase)?;
    }

    writeln!(out, "\n=== Service ===")?;
    let endpoints: Vec<String> = svc.endpoints.iter().map(ToString::to_string).collect();
    writeln!(
        out,
        "{}: VIP {}, Endpoints: [{}]",
        svc.name,
        svc.virtual_ip,
        endpoints.join(", ")
    )?;

    writeln!(out, "\n=== Routes ===")?;
    for i in 1..=3 {
        writeln!(out, "Request {i} -> {}", route_request(&state, "web")?)?;
    }

    writeln!(out, "\n=== Cluster Capacity ===")?;
    let cap = cluster_capacity(&state);
    write!(out, "CPU: {}/{}, Mem: {}/{}", cap.cpu_used, cap.cpu_total, cap.mem_used, cap.mem_total)?;
    Ok(out)
}
