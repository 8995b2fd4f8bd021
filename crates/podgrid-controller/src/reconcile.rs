//! Deployment reconciliation.
//!
//! Level-triggered: each pass compares a deployment's desired replica count
//! against its active pods (Pending or Running, matching the selector) and
//! creates or deletes pods to close the gap. Failed replicas are requeued
//! before anything new is created, and Failed replicas beyond the desired
//! count are deleted, so a deployment that cannot be placed never holds more
//! than `replicas` pods. Scheduling and endpoint refresh run once after all
//! deployments are processed. Running a pass twice with no state change in
//! between leaves the same pod set.

use tracing::{debug, info, warn};

use podgrid_scheduler::{ScheduleReport, schedule_pending_pods};
use podgrid_state::*;

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<PodUid>,
    /// Failed replicas sent back to Pending.
    pub requeued: Vec<PodUid>,
    pub deleted: Vec<PodUid>,
    pub schedule: ScheduleReport,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.requeued.is_empty()
            && self.deleted.is_empty()
            && self.schedule.is_empty()
    }
}

/// Reconcile every deployment, then schedule and refresh endpoints once.
pub fn reconcile_deployments(state: &ClusterState) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for deployment in state.deployments() {
        reconcile_one(state, &deployment, &mut report);
    }

    report.schedule = schedule_pending_pods(state);
    state.refresh_service_endpoints();

    if !report.created.is_empty() || !report.deleted.is_empty() {
        info!(
            created = report.created.len(),
            requeued = report.requeued.len(),
            deleted = report.deleted.len(),
            "deployments reconciled"
        );
    }
    report
}

fn reconcile_one(state: &ClusterState, deployment: &Deployment, report: &mut ReconcileReport) {
    // `select_pods` yields uid order, oldest first.
    let (active, failed): (Vec<Pod>, Vec<Pod>) = state
        .select_pods(&deployment.selector)
        .into_iter()
        .partition(|p| p.status.phase.is_active());
    let desired = deployment.replicas as usize;
    let missing = desired.saturating_sub(active.len());

    let mut revived = 0;
    for (i, pod) in failed.iter().enumerate() {
        if i < missing {
            match state.requeue_failed_pod(pod.uid) {
                Ok(()) => {
                    report.requeued.push(pod.uid);
                    revived += 1;
                }
                // Someone else already revived it.
                Err(ClusterError::InvalidState(_)) => revived += 1,
                Err(e) => warn!(deployment = %deployment.name, pod = %pod.uid, error = %e, "failed to requeue pod"),
            }
        } else {
            match state.remove_pod(pod.uid) {
                Ok(_) => report.deleted.push(pod.uid),
                Err(e) => warn!(deployment = %deployment.name, pod = %pod.uid, error = %e, "failed to delete failed pod"),
            }
        }
    }

    if missing > revived {
        let created = state.add_replica_pods(deployment, active.len() + revived + 1, missing - revived);
        debug!(
            deployment = %deployment.name,
            active = active.len(),
            revived,
            desired,
            created = created.len(),
            "scaling up"
        );
        report.created.extend(created.iter().map(|p| p.uid));
    } else if desired < active.len() {
        // Newest pods go first.
        for pod in active[desired..].iter().rev() {
            match state.remove_pod(pod.uid) {
                Ok(_) => report.deleted.push(pod.uid),
                Err(e) => warn!(deployment = %deployment.name, pod = %pod.uid, error = %e, "failed to delete excess pod"),
            }
        }
        debug!(
            deployment = %deployment.name,
            active = active.len(),
            desired,
            "scaling down"
        );
    }
}

/// Register a deployment and reconcile immediately.
pub fn create_deployment(state: &ClusterState, deployment: Deployment) -> ClusterResult<ReconcileReport> {
    let name = deployment.name.clone();
    state.add_deployment(deployment)?;
    info!(deployment = %name, "deployment created");
    Ok(reconcile_deployments(state))
}

/// Change a deployment's replica count and reconcile.
pub fn scale_deployment(state: &ClusterState, name: &str, replicas: u32) -> ClusterResult<ReconcileReport> {
    state.scale_deployment(name, replicas)?;
    info!(deployment = %name, replicas, "deployment scaled");
    Ok(reconcile_deployments(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn deployment(name: &str, replicas: u32) -> Deployment {
        Deployment {
            name: name.to_string(),
            image: "nginx".to_string(),
            replicas,
            selector: labels(&[("app", name)]),
            labels: labels(&[("app", name)]),
            cpu_request: 1,
            mem_request: 128,
        }
    }

    fn active_names(state: &ClusterState, app: &str) -> Vec<String> {
        state
            .select_pods(&labels(&[("app", app)]))
            .into_iter()
            .filter(|p| p.status.phase.is_active())
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn creates_missing_replicas_with_ordinals() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 8, 4096)).unwrap();

        let report = create_deployment(&state, deployment("web", 3)).unwrap();

        assert_eq!(report.created.len(), 3);
        assert_eq!(report.schedule.bound.len(), 3);
        assert_eq!(active_names(&state, "web"), vec!["web-1", "web-2", "web-3"]);
        assert!(state.pods().iter().all(|p| p.is_running()));
    }

    #[test]
    fn second_pass_is_noop() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 8, 4096)).unwrap();
        create_deployment(&state, deployment("web", 2)).unwrap();
        let before = state.pods();

        let report = reconcile_deployments(&state);

        assert!(report.is_noop());
        assert_eq!(state.pods(), before);
    }

    #[test]
    fn scale_down_deletes_newest_first() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 8, 4096)).unwrap();
        create_deployment(&state, deployment("web", 3)).unwrap();

        let report = scale_deployment(&state, "web", 1).unwrap();

        assert_eq!(report.deleted, vec![PodUid(3), PodUid(2)]);
        assert_eq!(active_names(&state, "web"), vec!["web-1"]);
        let node = state.get_node("n1").unwrap();
        assert_eq!((node.cpu_allocated, node.mem_allocated), (1, 128));
    }

    #[test]
    fn scale_to_zero_removes_all() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 8, 4096)).unwrap();
        create_deployment(&state, deployment("web", 2)).unwrap();

        scale_deployment(&state, "web", 0).unwrap();

        assert!(state.pods().is_empty());
        assert_eq!(state.get_node("n1").unwrap().cpu_allocated, 0);
    }

    #[test]
    fn failed_replicas_are_retried_in_place() {
        let state = ClusterState::new();
        create_deployment(&state, deployment("web", 1)).unwrap();
        assert_eq!(state.pods()[0].status.phase, PodPhase::Failed);

        state.add_node(Node::new("n1", 8, 4096)).unwrap();
        let report = reconcile_deployments(&state);

        assert!(report.created.is_empty());
        assert_eq!(report.requeued, vec![PodUid(1)]);
        assert_eq!(active_names(&state, "web"), vec!["web-1"]);
        assert_eq!(state.pods().len(), 1);
        assert!(state.pods()[0].is_running());
    }

    #[test]
    fn unplaceable_deployment_does_not_grow() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 1, 4096)).unwrap();
        let mut big = deployment("big", 2);
        big.cpu_request = 4;
        create_deployment(&state, big).unwrap();
        let first = state.pods();

        for _ in 0..5 {
            let report = reconcile_deployments(&state);
            assert!(report.created.is_empty());
            assert_eq!(state.pods(), first);
        }
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|p| p.status.phase == PodPhase::Failed));
    }

    #[test]
    fn scale_down_drops_surplus_failed_replicas() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 1, 4096)).unwrap();
        let mut big = deployment("big", 3);
        big.cpu_request = 4;
        create_deployment(&state, big).unwrap();

        let report = scale_deployment(&state, "big", 1).unwrap();

        assert_eq!(report.requeued, vec![PodUid(1)]);
        assert_eq!(report.deleted, vec![PodUid(2), PodUid(3)]);
        assert_eq!(state.pods().len(), 1);
    }

    #[test]
    fn replacement_names_avoid_survivors() {
        let state = ClusterState::new();
        state.add_node(Node::new("n1", 8, 4096)).unwrap();
        create_deployment(&state, deployment("web", 3)).unwrap();

        // Drop the first replica; the next pass refills without reusing a live name.
        state.remove_pod(PodUid(1)).unwrap();
        reconcile_deployments(&state);

        assert_eq!(active_names(&state, "web"), vec!["web-2", "web-3", "web-4"]);
    }

    #[test]
    fn unknown_and_duplicate_deployments() {
        let state = ClusterState::new();
        create_deployment(&state, deployment("web", 0)).unwrap();

        assert!(matches!(
            create_deployment(&state, deployment("web", 1)),
            Err(ClusterError::AlreadyExists { .. })
        ));
        assert!(matches!(
            scale_deployment(&state, "api", 1),
            Err(ClusterError::NotFound { .. })
        ));
    }
}
