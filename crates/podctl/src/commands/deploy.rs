use serde::Serialize;
use tabled::Tabled;

use podgrid_controller::{create_deployment, scale_deployment};
use podgrid_state::{ClusterState, Deployment};

use crate::labels::{format_labels, labels_or_app};
use crate::output::{OutputFormat, render_list, render_value};

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "IMAGE")]
    image: String,
    #[tabled(rename = "READY")]
    ready: String,
    #[tabled(rename = "CPU")]
    cpu: u64,
    #[tabled(rename = "MEM")]
    mem: u64,
    #[tabled(rename = "SELECTOR")]
    selector: String,
}

/// A deployment with its Running replica count.
#[derive(Serialize)]
struct DeploymentView {
    #[serde(flatten)]
    deployment: Deployment,
    running: usize,
}

impl From<DeploymentView> for DeploymentRow {
    fn from(v: DeploymentView) -> Self {
        let d = v.deployment;
        Self {
            ready: format!("{}/{}", v.running, d.replicas),
            name: d.name,
            image: d.image,
            cpu: d.cpu_request,
            mem: d.mem_request,
            selector: format_labels(&d.selector),
        }
    }
}

/// Flags for `deploy create`.
#[derive(Debug, Clone)]
pub struct CreateDeployment {
    pub name: String,
    pub image: String,
    pub replicas: u32,
    pub cpu: u64,
    pub mem: u64,
    pub selector: String,
    pub labels: String,
}

pub fn create(state: &ClusterState, args: CreateDeployment, format: OutputFormat) -> anyhow::Result<String> {
    let deployment = Deployment {
        selector: labels_or_app(&args.selector, &args.name)?,
        labels: labels_or_app(&args.labels, &args.name)?,
        name: args.name,
        image: args.image,
        replicas: args.replicas,
        cpu_request: args.cpu,
        mem_request: args.mem,
    };
    let name = deployment.name.clone();
    let replicas = deployment.replicas;
    let report = create_deployment(state, deployment)?;

    let text = format!(
        "Created deployment {name} with {replicas} replicas ({} scheduled, {} failed)",
        report.schedule.bound.len(),
        report.schedule.failed.len()
    );
    render_value(&report.created, format, text)
}

pub fn scale(state: &ClusterState, name: &str, replicas: u32, format: OutputFormat) -> anyhow::Result<String> {
    let report = scale_deployment(state, name, replicas)?;
    let text = format!(
        "Scaled {name} to {replicas} replicas (+{} -{})",
        report.created.len(),
        report.deleted.len()
    );
    render_value(&state.get_deployment(name), format, text)
}

pub fn list(state: &ClusterState, format: OutputFormat) -> anyhow::Result<String> {
    let views: Vec<DeploymentView> = state
        .deployments()
        .into_iter()
        .map(|deployment| {
            let running = state
                .select_pods(&deployment.selector)
                .iter()
                .filter(|p| p.is_running())
                .count();
            DeploymentView { deployment, running }
        })
        .collect();
    render_list(views, format, "No deployments present", DeploymentRow::from)
}
