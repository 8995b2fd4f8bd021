use tabled::Tabled;

use podgrid_controller::{create_service, delete_service, route_request};
use podgrid_state::{ClusterState, Service};

use crate::labels::{format_labels, labels_or_app};
use crate::output::{OutputFormat, render_list, render_value};

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "VIRTUAL-IP")]
    vip: String,
    #[tabled(rename = "PORT")]
    ports: String,
    #[tabled(rename = "SELECTOR")]
    selector: String,
    #[tabled(rename = "ENDPOINTS")]
    endpoints: String,
}

impl From<Service> for ServiceRow {
    fn from(s: Service) -> Self {
        Self {
            vip: s.virtual_ip.to_string(),
            ports: format!("{}->{}", s.port, s.target_port),
            selector: format_labels(&s.selector),
            endpoints: endpoint_list(&s),
            name: s.name,
        }
    }
}

fn endpoint_list(s: &Service) -> String {
    if s.endpoints.is_empty() {
        return "<none>".to_string();
    }
    s.endpoints
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// `target_port` defaults to `port`; an empty selector defaults to `app=<name>`.
pub fn create(
    state: &ClusterState,
    name: &str,
    selector: &str,
    port: u16,
    target_port: Option<u16>,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let selector = labels_or_app(selector, name)?;
    let svc = create_service(state, name, selector, port, target_port.unwrap_or(port))?;
    let text = format!(
        "Created service {} with VIP {} ({} endpoints)",
        svc.name,
        svc.virtual_ip,
        svc.endpoints.len()
    );
    render_value(&svc, format, text)
}

pub fn list(state: &ClusterState, format: OutputFormat) -> anyhow::Result<String> {
    render_list(state.services(), format, "No services present", ServiceRow::from)
}

/// Route `count` requests and report which pod served each.
pub fn route(state: &ClusterState, name: &str, count: usize, format: OutputFormat) -> anyhow::Result<String> {
    let picks = (0..count)
        .map(|_| route_request(state, name))
        .collect::<Result<Vec<_>, _>>()?;
    let text = picks
        .iter()
        .enumerate()
        .map(|(i, uid)| format!("Request {} -> {uid}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    render_value(&picks, format, text)
}

pub fn delete(state: &ClusterState, name: &str, format: OutputFormat) -> anyhow::Result<String> {
    let svc = delete_service(state, name)?;
    render_value(&svc, format, format!("Deleted service {name}"))
}
