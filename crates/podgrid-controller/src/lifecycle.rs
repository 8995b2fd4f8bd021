//! Pod lifecycle operations composed from store primitives.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use podgrid_scheduler::schedule_pending_pods;
use podgrid_state::*;

/// Add a pod, run a scheduling sweep, and refresh endpoints.
///
/// The returned pod reflects the outcome of that sweep.
pub fn create_pod(state: &ClusterState, spec: PodSpec) -> Pod {
    let pod = state.add_pod(spec);
    schedule_pending_pods(state);
    state.refresh_service_endpoints();
    let pod = state.get_pod(pod.uid).unwrap_or(pod);
    info!(pod = %pod.uid, name = %pod.name, phase = %pod.status.phase, "pod created");
    pod
}

/// Delete a pod and refresh endpoints.
pub fn delete_pod(state: &ClusterState, uid: PodUid) -> ClusterResult<Pod> {
    let pod = state.remove_pod(uid)?;
    state.refresh_service_endpoints();
    info!(pod = %uid, "pod deleted");
    Ok(pod)
}

/// Mark a Running pod healthy and stamp its start time.
pub fn health_check_pod(state: &ClusterState, uid: PodUid) -> ClusterResult<Pod> {
    state.mark_pod_healthy(uid, epoch_secs())
}

/// Replace a pod with a fresh copy of its spec.
///
/// The replacement gets a new uid; the restart count carries over plus one.
pub fn restart_pod(state: &ClusterState, uid: PodUid) -> ClusterResult<Pod> {
    let pod = state
        .get_pod(uid)
        .ok_or_else(|| ClusterError::not_found("pod", uid))?;
    if pod.spec.restart_policy == RestartPolicy::Never {
        return Err(ClusterError::PolicyViolation(format!(
            "pod {uid} has restart policy Never"
        )));
    }

    state.remove_pod(uid)?;
    let replacement = state.add_restarted_pod(pod.spec, pod.status.restart_count + 1);
    schedule_pending_pods(state);
    state.refresh_service_endpoints();

    let replacement = state.get_pod(replacement.uid).unwrap_or(replacement);
    info!(
        old = %uid,
        new = %replacement.uid,
        restarts = replacement.status.restart_count,
        phase = %replacement.status.phase,
        "pod restarted"
    );
    Ok(replacement)
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ClusterState {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 2, 1024)).unwrap();
        state
    }

    #[test]
    fn create_pod_reports_scheduled_phase() {
        let state = cluster();
        let pod = create_pod(&state, PodSpec::new("a", "nginx", 1, 128));

        assert_eq!(pod.status.phase, PodPhase::Running);
        assert_eq!(pod.status.node_name.as_deref(), Some("n1"));
    }

    #[test]
    fn create_pod_without_room_is_failed() {
        let state = cluster();
        let pod = create_pod(&state, PodSpec::new("big", "nginx", 3, 128));

        assert_eq!(pod.status.phase, PodPhase::Failed);
        assert!(pod.status.node_name.is_none());
    }

    #[test]
    fn delete_pod_not_found_propagates() {
        let state = cluster();
        assert!(matches!(
            delete_pod(&state, PodUid(9)),
            Err(ClusterError::NotFound { kind: "pod", .. })
        ));
    }

    #[test]
    fn health_check_running_pod() {
        let state = cluster();
        let pod = create_pod(&state, PodSpec::new("a", "nginx", 1, 128));

        let checked = health_check_pod(&state, pod.uid).unwrap();
        assert!(checked.status.healthy);
        assert!(checked.status.started_at.is_some());
    }

    #[test]
    fn health_check_rejects_non_running() {
        let state = cluster();
        let pod = create_pod(&state, PodSpec::new("big", "nginx", 5, 128));

        assert!(matches!(
            health_check_pod(&state, pod.uid),
            Err(ClusterError::InvalidState(_))
        ));
        assert!(matches!(
            health_check_pod(&state, PodUid(77)),
            Err(ClusterError::NotFound { .. })
        ));
    }

    #[test]
    fn restart_replaces_pod_and_counts() {
        let state = cluster();
        let pod = create_pod(&state, PodSpec::new("a", "nginx", 1, 128));

        let first = restart_pod(&state, pod.uid).unwrap();
        let second = restart_pod(&state, first.uid).unwrap();

        assert!(state.get_pod(pod.uid).is_none());
        assert_ne!(first.uid, pod.uid);
        assert_eq!(first.status.restart_count, 1);
        assert_eq!(second.status.restart_count, 2);
        assert_eq!(second.status.phase, PodPhase::Running);
        assert_eq!(state.get_node("n1").unwrap().cpu_allocated, 1);
    }

    #[test]
    fn restart_never_policy_leaves_pod_untouched() {
        let state = cluster();
        let spec = PodSpec::new("a", "nginx", 1, 128).with_restart_policy(RestartPolicy::Never);
        let pod = create_pod(&state, spec);

        let err = restart_pod(&state, pod.uid).unwrap_err();

        assert!(matches!(err, ClusterError::PolicyViolation(_)));
        assert_eq!(state.get_pod(pod.uid), Some(pod));
        assert_eq!(state.pods().len(), 1);
    }

    #[test]
    fn restart_unknown_pod() {
        let state = cluster();
        assert!(matches!(
            restart_pod(&state, PodUid(1)),
            Err(ClusterError::NotFound { .. })
        ));
    }
}
