//! Node selection for a single pod.
//!
//! Filters out nodes that cannot host the pod, then orders the rest by a
//! deterministic bin-packing key:
//! - **Allocation**: least allocated first (CPU, then memory)
//! - **Capacity**: largest first among equally loaded nodes
//! - **Name**: lexicographic, so ties never depend on iteration order

use std::cmp::{Ordering, Reverse};
use std::fmt;

use podgrid_state::{Node, Pod};

/// Why a node was passed over for a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotReady,
    Tainted,
    InsufficientResources,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotReady => f.write_str("node not ready"),
            Rejection::Tainted => f.write_str("node tainted"),
            Rejection::InsufficientResources => f.write_str("insufficient resources"),
        }
    }
}

/// Check whether `node` can host `pod` right now.
pub fn check_node(node: &Node, pod: &Pod) -> Result<(), Rejection> {
    if !node.ready {
        return Err(Rejection::NotReady);
    }
    // No tolerations: any taint excludes the node.
    if !node.taints.is_empty() {
        return Err(Rejection::Tainted);
    }
    if !node.fits(pod.spec.cpu_request, pod.spec.mem_request) {
        return Err(Rejection::InsufficientResources);
    }
    Ok(())
}

/// Ordering used to pick among eligible nodes (`Less` = preferred).
pub fn placement_order(a: &Node, b: &Node) -> Ordering {
    let key = |n: &Node| {
        (
            (n.cpu_allocated, n.mem_allocated),
            Reverse((n.cpu_capacity, n.mem_capacity)),
        )
    };
    key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
}

/// All eligible nodes for `pod`, best first.
pub fn rank_nodes<'a>(nodes: &'a [Node], pod: &Pod) -> Vec<&'a Node> {
    let mut eligible: Vec<&Node> = nodes
        .iter()
        .filter(|n| check_node(n, pod).is_ok())
        .collect();
    eligible.sort_by(|a, b| placement_order(a, b));
    eligible
}

/// Select the placement target for `pod`, or `None` if no node is eligible.
pub fn choose_node<'a>(nodes: &'a [Node], pod: &Pod) -> Option<&'a Node> {
    nodes
        .iter()
        .filter(|n| check_node(n, pod).is_ok())
        .min_by(|a, b| placement_order(a, b))
}
