//! podgrid-persist — persistence collaborators for the cluster store.
//!
//! The store itself never touches disk. This crate moves its snapshot in
//! and out of durable storage and drives the periodic control loop.
//!
//! # Components
//!
//! - **`backend`** — the `StateBackend` contract and backend selection
//! - **`json_file`** — one JSON document on disk
//! - **`redb_store`** — embedded redb database, single write transaction per save
//! - **`control_loop`** — load, reconcile, schedule, save on an interval

pub mod backend;
pub mod control_loop;
pub mod error;
pub mod json_file;
pub mod redb_store;

pub use backend::{BackendKind, StateBackend, open_backend};
pub use control_loop::{ControlLoop, StateFn};
pub use error::{PersistError, PersistResult};
pub use json_file::JsonFileBackend;
pub use redb_store::RedbBackend;
