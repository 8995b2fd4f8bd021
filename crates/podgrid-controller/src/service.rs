//! Service layer: virtual IPs, endpoint derivation, round-robin routing.
//!
//! Round-robin is fair over the current endpoint ordering only. When the
//! endpoint set changes between requests the cursor is re-taken modulo the
//! new length, which may skew distribution over short windows.

use tracing::info;

use podgrid_state::*;

/// Allocate a virtual IP, register the service, and populate its endpoints.
pub fn create_service(
    state: &ClusterState,
    name: &str,
    selector: Labels,
    port: u16,
    target_port: u16,
) -> ClusterResult<Service> {
    if state.get_service(name).is_some() {
        return Err(ClusterError::already_exists("service", name));
    }
    let service = Service {
        name: name.to_string(),
        selector,
        port,
        target_port,
        virtual_ip: state.allocate_virtual_ip()?,
        endpoints: Vec::new(),
        rr_index: 0,
    };
    let vip = service.virtual_ip;
    state.add_service(service)?;
    state.refresh_service_endpoints();
    info!(service = %name, %vip, "service created");

    state
        .get_service(name)
        .ok_or_else(|| ClusterError::not_found("service", name))
}

/// Pick the next backing pod for a request to `name`.
///
/// Endpoints are refreshed first so a pod removed since the last request
/// is never returned.
pub fn route_request(state: &ClusterState, name: &str) -> ClusterResult<PodUid> {
    state.route_request(name)
}

/// Remove a service from the registry.
pub fn delete_service(state: &ClusterState, name: &str) -> ClusterResult<Service> {
    let svc = state.remove_service(name)?;
    info!(service = %name, vip = %svc.virtual_ip, "service deleted");
    Ok(svc)
}
