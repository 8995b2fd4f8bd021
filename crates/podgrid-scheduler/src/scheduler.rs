//! Pending-pod sweep.
//!
//! Walks every Pending pod in uid order, picks a node with
//! [`choose_node`], and binds it through the store. A pod with no eligible
//! node is marked Failed; that is a steady-state outcome, not an error.

use tracing::{debug, info, warn};

use podgrid_state::{ClusterError, ClusterState, NodeName, PodPhase, PodUid};

use crate::placement::choose_node;

/// Message recorded on pods that could not be placed.
pub const NO_FIT_MESSAGE: &str = "No nodes have enough free resources";

/// Outcome of one scheduling sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub bound: Vec<(PodUid, NodeName)>,
    pub failed: Vec<PodUid>,
}

impl ScheduleReport {
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty() && self.failed.is_empty()
    }
}

/// Try to place every Pending pod.
pub fn schedule_pending_pods(state: &ClusterState) -> ScheduleReport {
    let pending: Vec<_> = state
        .pods()
        .into_iter()
        .filter(|p| p.status.phase == PodPhase::Pending)
        .collect();
    let mut report = ScheduleReport::default();
    if pending.is_empty() {
        return report;
    }

    // Local view of the nodes, kept in step with each bind below.
    let mut nodes = state.nodes();

    for pod in &pending {
        // A bind can lose a race with a concurrent sweep; retry against a
        // fresh node view, at most once per node.
        let mut attempts = nodes.len().max(1);
        loop {
            let Some(target) = choose_node(&nodes, pod).map(|n| n.name.clone()) else {
                mark_failed(state, pod.uid, &mut report);
                break;
            };

            match state.bind_pod(pod.uid, &target) {
                Ok(()) => {
                    if let Some(node) = nodes.iter_mut().find(|n| n.name == target) {
                        node.cpu_allocated += pod.spec.cpu_request;
                        node.mem_allocated += pod.spec.mem_request;
                    }
                    debug!(pod = %pod.uid, node = %target, "pod scheduled");
                    report.bound.push((pod.uid, target));
                    break;
                }
                Err(ClusterError::NotFound { kind: "pod", .. }) => {
                    debug!(pod = %pod.uid, "pod vanished before binding");
                    break;
                }
                Err(ClusterError::InvalidState(reason)) => {
                    debug!(pod = %pod.uid, %reason, "pod placed elsewhere");
                    break;
                }
                Err(e) => {
                    warn!(pod = %pod.uid, node = %target, error = %e, "bind failed, resyncing nodes");
                    nodes = state.nodes();
                    attempts -= 1;
                    if attempts == 0 {
                        mark_failed(state, pod.uid, &mut report);
                        break;
                    }
                }
            }
        }
    }

    if !report.is_empty() {
        info!(
            bound = report.bound.len(),
            failed = report.failed.len(),
            "scheduling sweep finished"
        );
    }
    report
}

fn mark_failed(state: &ClusterState, uid: PodUid, report: &mut ScheduleReport) {
    match state.set_pod_failed(uid, NO_FIT_MESSAGE) {
        Ok(()) => report.failed.push(uid),
        Err(e) => debug!(pod = %uid, error = %e, "could not mark pod failed"),
    }
}
