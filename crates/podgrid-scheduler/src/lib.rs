//! podgrid-scheduler — pod placement for podgrid.
//!
//! Pure placement functions over a node set, plus the sweep that binds every
//! Pending pod through the `ClusterState` store.
//!
//! # Components
//!
//! - **`placement`** — eligibility filter and deterministic node ordering
//! - **`scheduler`** — the Pending-pod sweep (`schedule_pending_pods`)

pub mod placement;
pub mod scheduler;

pub use placement::{Rejection, check_node, choose_node, placement_order, rank_nodes};
pub use scheduler::{NO_FIT_MESSAGE, ScheduleReport, schedule_pending_pods};
