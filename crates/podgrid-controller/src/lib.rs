//! podgrid-controller — control-plane operations layered on the store.
//!
//! Every operation here is a composition of `ClusterState` primitives and
//! the scheduler sweep. Nothing in this crate holds state of its own.
//!
//! # Components
//!
//! - **`reconcile`** — converge deployments toward their replica counts
//! - **`service`** — virtual IPs and round-robin request routing
//! - **`lifecycle`** — create, delete, health-check, restart pods
//! - **`node`** — node join and drain, each followed by a sweep
//! - **`resource`** — per-node and cluster-wide usage reports

pub mod lifecycle;
pub mod node;
pub mod reconcile;
pub mod resource;
pub mod service;

pub use lifecycle::{create_pod, delete_pod, health_check_pod, restart_pod};
pub use node::{drain_node, join_node};
pub use reconcile::{ReconcileReport, create_deployment, reconcile_deployments, scale_deployment};
pub use resource::{ClusterCapacity, NodeResourceRow, cluster_capacity, node_resource_table};
pub use service::{create_service, delete_service, route_request};
