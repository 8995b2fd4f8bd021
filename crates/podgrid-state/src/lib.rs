//! podgrid-state — the cluster state store for podgrid.
//!
//! Owns every node, pod, service, and deployment behind one readers/writer
//! lock, and enforces the resource and referential invariants:
//!
//! - a node's allocation never exceeds its capacity
//! - a Running pod is bound and counted in its node's allocation
//! - service endpoints equal the Running pods matching the selector
//!
//! # Architecture
//!
//! ```text
//! ClusterState (Arc<RwLock<..>>, Clone + Send + Sync)
//!   ├── nodes        name → Node
//!   ├── pods         uid  → Pod      (uid counter never reused)
//!   ├── services     name → Service  (VIP counter never reused)
//!   └── deployments  name → Deployment
//! ```
//!
//! Collections are ordered maps, so every listing is deterministic.
//! [`ClusterSnapshot`] is the serialized form handed to persistence backends.

pub mod error;
pub mod snapshot;
pub mod store;
pub mod types;

pub use error::{ClusterError, ClusterResult};
pub use snapshot::ClusterSnapshot;
pub use store::ClusterState;
pub use types::*;
