//! Node membership changes followed by a scheduling sweep.

use tracing::info;

use podgrid_scheduler::{ScheduleReport, schedule_pending_pods};
use podgrid_state::*;

/// Register a node and place any Pending pods onto the new capacity.
pub fn join_node(state: &ClusterState, node: Node) -> ClusterResult<ScheduleReport> {
    let name = node.name.clone();
    state.add_node(node)?;
    let report = schedule_pending_pods(state);
    state.refresh_service_endpoints();
    info!(node = %name, placed = report.bound.len(), "node joined");
    Ok(report)
}

/// Remove a node, then try to re-place the pods it was running.
///
/// Returns the uids detached from the node. Pods that find no room
/// elsewhere end up Failed.
pub fn drain_node(state: &ClusterState, name: &str) -> ClusterResult<Vec<PodUid>> {
    let detached = state.remove_node(name)?;
    state.refresh_service_endpoints();
    let report = schedule_pending_pods(state);
    state.refresh_service_endpoints();
    info!(
        node = %name,
        detached = detached.len(),
        rescheduled = report.bound.len(),
        "node removed"
    );
    Ok(detached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::create_pod;

    #[test]
    fn joining_node_places_pending_pods() {
        let state = ClusterState::new();
        let pod = state.add_pod(PodSpec::new("a", "nginx", 1, 128));

        let report = join_node(&state, Node::new("n1", 2, 1024)).unwrap();

        assert_eq!(report.bound, vec![(pod.uid, "n1".to_string())]);
        assert!(state.get_pod(pod.uid).unwrap().is_running());
    }

    #[test]
    fn drained_pods_move_to_surviving_node() {
        let state = ClusterState::new();
        join_node(&state, Node::new("n1", 2, 1024)).unwrap();
        let pod = create_pod(&state, PodSpec::new("a", "nginx", 1, 128));
        join_node(&state, Node::new("n2", 4, 4096)).unwrap();

        let detached = drain_node(&state, "n1").unwrap();

        assert_eq!(detached, vec![pod.uid]);
        let moved = state.get_pod(pod.uid).unwrap();
        assert_eq!(moved.status.node_name.as_deref(), Some("n2"));
        assert_eq!(state.get_node("n2").unwrap().cpu_allocated, 1);
    }

    #[test]
    fn drain_without_room_fails_pods() {
        let state = ClusterState::new();
        join_node(&state, Node::new("n1", 2, 1024)).unwrap();
        let pod = create_pod(&state, PodSpec::new("a", "nginx", 1, 128));

        drain_node(&state, "n1").unwrap();

        let pod = state.get_pod(pod.uid).unwrap();
        assert_eq!(pod.status.phase, PodPhase::Failed);
        assert!(pod.status.node_name.is_none());
        assert!(drain_node(&state, "n1").is_err());
    }
}
