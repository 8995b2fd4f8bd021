//! ClusterState — the lock-guarded source of truth for the control plane.
//!
//! Every read and write goes through one readers/writer lock over the whole
//! store. Readers get owned copies, so callers can iterate without holding
//! the lock. Node allocation counters, endpoint lists, and round-robin
//! cursors are only ever mutated here.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{ClusterError, ClusterResult};
use crate::snapshot::{ClusterSnapshot, first_vip_offset};
use crate::types::*;

/// Base of the virtual IP range handed to services.
const VIP_BASE: Ipv4Addr = Ipv4Addr::new(10, 96, 0, 0);
/// Number of addresses in `10.96.0.0/12`.
const VIP_RANGE: u32 = 1 << 20;

#[derive(Debug, Clone)]
struct Inner {
    nodes: BTreeMap<NodeName, Node>,
    pods: BTreeMap<PodUid, Pod>,
    services: BTreeMap<String, Service>,
    deployments: BTreeMap<String, Deployment>,
    pod_uid_counter: u64,
    vip_counter: u32,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            pods: BTreeMap::new(),
            services: BTreeMap::new(),
            deployments: BTreeMap::new(),
            pod_uid_counter: 0,
            vip_counter: first_vip_offset(),
        }
    }
}

impl Inner {
    fn insert_pod(&mut self, spec: PodSpec, restart_count: u32) -> Pod {
        self.pod_uid_counter += 1;
        let uid = PodUid(self.pod_uid_counter);
        let pod = Pod {
            uid,
            name: spec.name.clone(),
            spec,
            status: PodStatus {
                restart_count,
                ..PodStatus::default()
            },
        };
        self.pods.insert(uid, pod.clone());
        pod
    }

    fn refresh_endpoints(&mut self) {
        let pods = &self.pods;
        for svc in self.services.values_mut() {
            svc.endpoints = pods
                .values()
                .filter(|p| p.is_running() && p.matches(&svc.selector))
                .map(|p| p.uid)
                .collect();
        }
    }
}

/// Thread-safe, cheaply clonable handle to the cluster state.
#[derive(Debug, Clone, Default)]
pub struct ClusterState {
    inner: Arc<RwLock<Inner>>,
}

impl ClusterState {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation completes before its guard drops, so a poisoned
    // lock still protects consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Register a node. Allocation starts at zero since nothing is bound yet.
    pub fn add_node(&self, mut node: Node) -> ClusterResult<()> {
        let mut inner = self.write();
        if inner.nodes.contains_key(&node.name) {
            return Err(ClusterError::already_exists("node", &node.name));
        }
        node.cpu_allocated = 0;
        node.mem_allocated = 0;
        debug!(node = %node.name, cpu = node.cpu_capacity, mem = node.mem_capacity, "node added");
        inner.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Remove a node and move every pod bound to it back to Pending.
    ///
    /// Returns the uids of the detached pods.
    pub fn remove_node(&self, name: &str) -> ClusterResult<Vec<PodUid>> {
        let mut inner = self.write();
        if inner.nodes.remove(name).is_none() {
            return Err(ClusterError::not_found("node", name));
        }
        let mut detached = Vec::new();
        for pod in inner.pods.values_mut() {
            if pod.status.node_name.as_deref() == Some(name) {
                pod.status.node_name = None;
                pod.status.phase = PodPhase::Pending;
                pod.status.healthy = false;
                detached.push(pod.uid);
            }
        }
        debug!(node = %name, detached = detached.len(), "node removed");
        Ok(detached)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.read().nodes.values().cloned().collect()
    }

    pub fn get_node(&self, name: &str) -> Option<Node> {
        self.read().nodes.get(name).cloned()
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// Insert a new Pending pod under the next uid.
    pub fn add_pod(&self, spec: PodSpec) -> Pod {
        let pod = self.write().insert_pod(spec, 0);
        debug!(pod = %pod.uid, name = %pod.name, "pod added");
        pod
    }

    /// Insert a replacement pod carrying over a restart count.
    pub fn add_restarted_pod(&self, spec: PodSpec, restart_count: u32) -> Pod {
        let pod = self.write().insert_pod(spec, restart_count);
        debug!(pod = %pod.uid, name = %pod.name, restart_count, "restarted pod added");
        pod
    }

    /// Create `count` replica pods for a deployment named
    /// `<deployment>-<ordinal>`, starting at `first_ordinal` and skipping
    /// ordinals whose name is already taken. Names are reserved under the
    /// write lock, so concurrent reconciliations cannot collide.
    pub fn add_replica_pods(
        &self,
        deployment: &Deployment,
        first_ordinal: usize,
        count: usize,
    ) -> Vec<Pod> {
        let mut inner = self.write();
        let taken: BTreeSet<String> = inner.pods.values().map(|p| p.name.clone()).collect();
        let mut created = Vec::with_capacity(count);
        let mut ordinal = first_ordinal;
        while created.len() < count {
            let name = format!("{}-{}", deployment.name, ordinal);
            ordinal += 1;
            if taken.contains(&name) {
                continue;
            }
            let pod = inner.insert_pod(deployment.pod_template(name), 0);
            debug!(pod = %pod.uid, name = %pod.name, deployment = %deployment.name, "replica added");
            created.push(pod);
        }
        created
    }

    /// Delete a pod, releasing its reservation on the bound node.
    pub fn remove_pod(&self, uid: PodUid) -> ClusterResult<Pod> {
        let mut inner = self.write();
        let pod = inner
            .pods
            .remove(&uid)
            .ok_or_else(|| ClusterError::not_found("pod", uid))?;
        if let Some(node_name) = &pod.status.node_name
            && let Some(node) = inner.nodes.get_mut(node_name)
        {
            // Clamp rather than underflow if accounting ever drifted.
            node.cpu_allocated = node.cpu_allocated.saturating_sub(pod.spec.cpu_request);
            node.mem_allocated = node.mem_allocated.saturating_sub(pod.spec.mem_request);
        }
        debug!(pod = %uid, "pod removed");
        Ok(pod)
    }

    /// Bind a pod to a node, reserving its request.
    ///
    /// Capacity is re-checked here, not only at selection time.
    pub fn bind_pod(&self, uid: PodUid, node_name: &str) -> ClusterResult<()> {
        let mut inner = self.write();
        let Inner { nodes, pods, .. } = &mut *inner;
        let pod = pods
            .get_mut(&uid)
            .ok_or_else(|| ClusterError::not_found("pod", uid))?;
        let node = nodes
            .get_mut(node_name)
            .ok_or_else(|| ClusterError::not_found("node", node_name))?;
        if let Some(bound) = &pod.status.node_name {
            return Err(ClusterError::InvalidState(format!(
                "pod {uid} is already bound to {bound}"
            )));
        }
        if pod.status.phase != PodPhase::Pending {
            return Err(ClusterError::InvalidState(format!(
                "pod {uid} is {}, not Pending",
                pod.status.phase
            )));
        }
        if !node.fits(pod.spec.cpu_request, pod.spec.mem_request) {
            return Err(ClusterError::InsufficientResources {
                pod: uid.to_string(),
                node: node_name.to_string(),
            });
        }
        node.cpu_allocated += pod.spec.cpu_request;
        node.mem_allocated += pod.spec.mem_request;
        pod.status.node_name = Some(node_name.to_string());
        pod.status.phase = PodPhase::Running;
        pod.status.message.clear();
        debug!(pod = %uid, node = %node_name, "pod bound");
        Ok(())
    }

    /// Mark an unbound pod Failed with a diagnostic message.
    pub fn set_pod_failed(&self, uid: PodUid, message: &str) -> ClusterResult<()> {
        let mut inner = self.write();
        let pod = inner
            .pods
            .get_mut(&uid)
            .ok_or_else(|| ClusterError::not_found("pod", uid))?;
        if let Some(bound) = &pod.status.node_name {
            return Err(ClusterError::InvalidState(format!(
                "pod {uid} is bound to {bound}"
            )));
        }
        pod.status.phase = PodPhase::Failed;
        pod.status.message = message.to_string();
        debug!(pod = %uid, %message, "pod failed");
        Ok(())
    }

    /// Return a Failed pod to Pending so the next sweep retries it.
    ///
    /// The pod keeps its uid and name.
    pub fn requeue_failed_pod(&self, uid: PodUid) -> ClusterResult<()> {
        let mut inner = self.write();
        let pod = inner
            .pods
            .get_mut(&uid)
            .ok_or_else(|| ClusterError::not_found("pod", uid))?;
        if pod.status.phase != PodPhase::Failed {
            return Err(ClusterError::InvalidState(format!(
                "pod {uid} is {}, not Failed",
                pod.status.phase
            )));
        }
        pod.status.phase = PodPhase::Pending;
        pod.status.message.clear();
        debug!(pod = %uid, "pod requeued");
        Ok(())
    }

    /// Record a passing health check on a Running pod.
    pub fn mark_pod_healthy(&self, uid: PodUid, now: u64) -> ClusterResult<Pod> {
        let mut inner = self.write();
        let pod = inner
            .pods
            .get_mut(&uid)
            .ok_or_else(|| ClusterError::not_found("pod", uid))?;
        if !pod.is_running() {
            return Err(ClusterError::InvalidState(format!("pod {uid} is not running")));
        }
        pod.status.healthy = true;
        pod.status.started_at = Some(now);
        Ok(pod.clone())
    }

    pub fn pods(&self) -> Vec<Pod> {
        self.read().pods.values().cloned().collect()
    }

    pub fn get_pod(&self, uid: PodUid) -> Option<Pod> {
        self.read().pods.get(&uid).cloned()
    }

    /// All pods whose labels are a superset match of `selector`, in uid order.
    pub fn select_pods(&self, selector: &Labels) -> Vec<Pod> {
        self.read()
            .pods
            .values()
            .filter(|p| p.matches(selector))
            .cloned()
            .collect()
    }

    // ── Services ───────────────────────────────────────────────────

    pub fn add_service(&self, service: Service) -> ClusterResult<()> {
        let mut inner = self.write();
        if inner.services.contains_key(&service.name) {
            return Err(ClusterError::already_exists("service", &service.name));
        }
        debug!(service = %service.name, vip = %service.virtual_ip, "service added");
        inner.services.insert(service.name.clone(), service);
        Ok(())
    }

    pub fn remove_service(&self, name: &str) -> ClusterResult<Service> {
        let svc = self
            .write()
            .services
            .remove(name)
            .ok_or_else(|| ClusterError::not_found("service", name))?;
        debug!(service = %name, "service removed");
        Ok(svc)
    }

    /// Recompute every service's endpoints from the Running pods.
    ///
    /// Full recompute, never an incremental diff.
    pub fn refresh_service_endpoints(&self) {
        self.write().refresh_endpoints();
    }

    /// Refresh endpoints and take the next round-robin endpoint of a
    /// service, atomically.
    pub fn route_request(&self, name: &str) -> ClusterResult<PodUid> {
        let mut inner = self.write();
        if !inner.services.contains_key(name) {
            return Err(ClusterError::not_found("service", name));
        }
        inner.refresh_endpoints();
        let svc = inner
            .services
            .get_mut(name)
            .ok_or_else(|| ClusterError::not_found("service", name))?;
        let uid = svc
            .next_endpoint()
            .ok_or_else(|| ClusterError::NoReadyPods(name.to_string()))?;
        debug!(service = %name, pod = %uid, "request routed");
        Ok(uid)
    }

    /// Hand out a virtual IP that has never been issued by this store.
    ///
    /// Fails once every address in `10.96.0.0/12` has been issued.
    pub fn allocate_virtual_ip(&self) -> ClusterResult<Ipv4Addr> {
        let mut inner = self.write();
        let offset = inner.vip_counter;
        if offset >= VIP_RANGE {
            return Err(ClusterError::VipExhausted(format!("{VIP_BASE}/12")));
        }
        inner.vip_counter = offset + 1;
        Ok(Ipv4Addr::from(u32::from(VIP_BASE) + offset))
    }

    pub fn services(&self) -> Vec<Service> {
        self.read().services.values().cloned().collect()
    }

    pub fn get_service(&self, name: &str) -> Option<Service> {
        self.read().services.get(name).cloned()
    }

    // ── Deployments ────────────────────────────────────────────────

    pub fn add_deployment(&self, deployment: Deployment) -> ClusterResult<()> {
        let mut inner = self.write();
        if inner.deployments.contains_key(&deployment.name) {
            return Err(ClusterError::already_exists("deployment", &deployment.name));
        }
        debug!(deployment = %deployment.name, replicas = deployment.replicas, "deployment added");
        inner.deployments.insert(deployment.name.clone(), deployment);
        Ok(())
    }

    /// Update a deployment's desired replica count in place.
    pub fn scale_deployment(&self, name: &str, replicas: u32) -> ClusterResult<()> {
        let mut inner = self.write();
        let deployment = inner
            .deployments
            .get_mut(name)
            .ok_or_else(|| ClusterError::not_found("deployment", name))?;
        debug!(deployment = %name, from = deployment.replicas, to = replicas, "deployment scaled");
        deployment.replicas = replicas;
        Ok(())
    }

    pub fn deployments(&self) -> Vec<Deployment> {
        self.read().deployments.values().cloned().collect()
    }

    pub fn get_deployment(&self, name: &str) -> Option<Deployment> {
        self.read().deployments.get(name).cloned()
    }

    // ── Snapshots ──────────────────────────────────────────────────

    /// Capture a consistent image of the whole store.
    pub fn snapshot(&self) -> ClusterSnapshot {
        let inner = self.read();
        ClusterSnapshot {
            nodes: inner.nodes.values().cloned().collect(),
            pods: inner.pods.values().cloned().collect(),
            services: inner.services.values().cloned().collect(),
            deployments: inner.deployments.values().cloned().collect(),
            pod_uid_counter: inner.pod_uid_counter,
            vip_counter: inner.vip_counter,
        }
    }

    /// Build a store from a snapshot.
    pub fn from_snapshot(snapshot: ClusterSnapshot) -> Self {
        let state = Self::new();
        state.replace(snapshot);
        state
    }

    /// Fully replace the in-memory state with `snapshot`.
    pub fn replace(&self, snapshot: ClusterSnapshot) {
        let max_uid = snapshot.pods.iter().map(|p| p.uid.0).max().unwrap_or(0);
        let next = Inner {
            nodes: snapshot.nodes.into_iter().map(|n| (n.name.clone(), n)).collect(),
            pods: snapshot.pods.into_iter().map(|p| (p.uid, p)).collect(),
            services: snapshot.services.into_iter().map(|s| (s.name.clone(), s)).collect(),
            deployments: snapshot
                .deployments
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
            // Never reissue a uid that is still present.
            pod_uid_counter: snapshot.pod_uid_counter.max(max_uid),
            vip_counter: snapshot.vip_counter.max(first_vip_offset()),
        };
        *self.write() = next;
    }

    /// Serialize the whole store into an opaque byte string.
    pub fn to_bytes(&self) -> ClusterResult<Vec<u8>> {
        self.snapshot().to_bytes()
    }

    /// Deserialize a store previously produced by [`ClusterState::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> ClusterResult<Self> {
        Ok(Self::from_snapshot(ClusterSnapshot::from_bytes(bytes)?))
    }

    /// Replace the in-memory state with a serialized snapshot.
    pub fn restore(&self, bytes: &[u8]) -> ClusterResult<()> {
        self.replace(ClusterSnapshot::from_bytes(bytes)?);
        Ok(())
    }
}
