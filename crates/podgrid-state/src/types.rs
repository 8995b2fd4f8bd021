//! Domain types for the podgrid cluster state.
//!
//! These types represent nodes, pods, services, and deployments. All types
//! are serializable to/from JSON so that a full snapshot of the store can
//! be handed to a persistence backend.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label set attached to nodes and pods, and used as selectors.
pub type Labels = BTreeMap<String, String>;

/// Unique identifier for a node in the cluster.
pub type NodeName = String;

/// Check whether `labels` satisfy `selector`: every selector key must be
/// present with an equal value. Extra labels are ignored, and an empty
/// selector matches everything.
pub fn selector_matches(labels: &Labels, selector: &Labels) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.get(k).is_some_and(|lv| lv == v))
}

// ── Node ──────────────────────────────────────────────────────────

/// A resource-bearing placement target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub name: NodeName,
    /// Total CPU units on this node.
    pub cpu_capacity: u64,
    /// Total memory on this node (MB).
    pub mem_capacity: u64,
    /// CPU reserved by bound pods.
    #[serde(default)]
    pub cpu_allocated: u64,
    /// Memory reserved by bound pods.
    #[serde(default)]
    pub mem_allocated: u64,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default = "default_ready")]
    pub ready: bool,
    #[serde(default)]
    pub taints: Vec<String>,
}

fn default_ready() -> bool {
    true
}

impl Node {
    /// A ready, untainted node with nothing allocated.
    pub fn new(name: impl Into<String>, cpu_capacity: u64, mem_capacity: u64) -> Self {
        Self {
            name: name.into(),
            cpu_capacity,
            mem_capacity,
            cpu_allocated: 0,
            mem_allocated: 0,
            labels: Labels::new(),
            ready: true,
            taints: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn cpu_available(&self) -> u64 {
        self.cpu_capacity.saturating_sub(self.cpu_allocated)
    }

    pub fn mem_available(&self) -> u64 {
        self.mem_capacity.saturating_sub(self.mem_allocated)
    }

    /// Whether a request of the given size fits in the remaining capacity.
    pub fn fits(&self, cpu_request: u64, mem_request: u64) -> bool {
        cpu_request <= self.cpu_available() && mem_request <= self.mem_available()
    }

    /// Ready and carrying no taints.
    pub fn is_schedulable(&self) -> bool {
        self.ready && self.taints.is_empty()
    }
}

// ── Pod ───────────────────────────────────────────────────────────

/// Monotonically assigned pod identifier. Rendered as `pod-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodUid(pub u64);

impl fmt::Display for PodUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pod-{}", self.0)
    }
}

impl FromStr for PodUid {
    type Err = std::num::ParseIntError;

    /// Accepts `pod-7` as well as a bare `7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("pod-").unwrap_or(s);
        digits.parse().map(PodUid)
    }
}

/// Lifecycle phase of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Failed,
}

impl PodPhase {
    /// Pending and Running pods count toward a deployment's replicas.
    pub fn is_active(self) -> bool {
        matches!(self, PodPhase::Pending | PodPhase::Running)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// What to do when a pod is asked to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RestartPolicy {
    #[default]
    Always,
    OnFailure,
    Never,
}

impl FromStr for RestartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(RestartPolicy::Always),
            "onfailure" | "on-failure" => Ok(RestartPolicy::OnFailure),
            "never" => Ok(RestartPolicy::Never),
            other => Err(format!("unknown restart policy: {other}")),
        }
    }
}

/// Health check parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheck {
    pub enabled: bool,
    /// Seconds to wait after start before the first probe.
    pub initial_delay_secs: u32,
    /// Probe interval in seconds.
    pub period_secs: u32,
    /// Timeout per probe in seconds.
    pub timeout_secs: u32,
    /// Consecutive failures before the pod is considered unhealthy.
    pub failure_threshold: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_secs: 0,
            period_secs: 10,
            timeout_secs: 1,
            failure_threshold: 3,
        }
    }
}

/// Desired state of a pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSpec {
    pub name: String,
    pub image: String,
    pub cpu_request: u64,
    pub mem_request: u64,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub health_check: HealthCheck,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

impl PodSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, cpu_request: u64, mem_request: u64) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            cpu_request,
            mem_request,
            labels: Labels::new(),
            health_check: HealthCheck::default(),
            restart_policy: RestartPolicy::default(),
        }
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    pub fn with_health_check(mut self, health_check: HealthCheck) -> Self {
        self.health_check = health_check;
        self
    }
}

/// Observed state of a pod.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PodStatus {
    pub phase: PodPhase,
    /// Bound node, `None` while unbound.
    pub node_name: Option<NodeName>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub healthy: bool,
    #[serde(default)]
    pub restart_count: u32,
    /// Unix timestamp of the last successful health check.
    #[serde(default)]
    pub started_at: Option<u64>,
}

/// A scheduled unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pod {
    pub uid: PodUid,
    pub name: String,
    pub spec: PodSpec,
    pub status: PodStatus,
}

impl Pod {
    pub fn is_running(&self) -> bool {
        self.status.phase == PodPhase::Running
    }

    /// Whether this pod's labels satisfy `selector`.
    pub fn matches(&self, selector: &Labels) -> bool {
        selector_matches(&self.spec.labels, selector)
    }
}

// ── Service ───────────────────────────────────────────────────────

/// A stable endpoint backed by a label selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub selector: Labels,
    pub port: u16,
    pub target_port: u16,
    pub virtual_ip: Ipv4Addr,
    /// Running pods matching the selector, in uid order.
    #[serde(default)]
    pub endpoints: Vec<PodUid>,
    /// Round-robin cursor into `endpoints`.
    #[serde(default)]
    pub rr_index: usize,
}

impl Service {
    /// Pick the endpoint under the cursor and advance it.
    ///
    /// The cursor is taken modulo the current endpoint count, so it stays
    /// valid when the endpoint set shrinks. Returns `None` when empty.
    pub fn next_endpoint(&mut self) -> Option<PodUid> {
        let count = self.endpoints.len();
        if count == 0 {
            return None;
        }
        let idx = self.rr_index % count;
        self.rr_index = (idx + 1) % count;
        Some(self.endpoints[idx])
    }
}

// ── Deployment ────────────────────────────────────────────────────

/// Declarative desired-replica-count controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deployment {
    pub name: String,
    pub image: String,
    pub replicas: u32,
    /// Selector used to find this deployment's pods.
    pub selector: Labels,
    /// Labels stamped onto every pod created from the template.
    pub labels: Labels,
    pub cpu_request: u64,
    pub mem_request: u64,
}

impl Deployment {
    /// Build the spec for a replica with the given name.
    pub fn pod_template(&self, name: String) -> PodSpec {
        PodSpec {
            name,
            image: self.image.clone(),
            cpu_request: self.cpu_request,
            mem_request: self.mem_request,
            labels: self.labels.clone(),
            health_check: HealthCheck::default(),
            restart_policy: RestartPolicy::default(),
        }
    }
}
