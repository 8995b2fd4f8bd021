//! podctl — command-line front end for podgrid.
//!
//! Each invocation loads the cluster from the configured backend, runs one
//! command, and saves the result back if the command changed anything.

pub mod commands;
pub mod config;
pub mod labels;
pub mod output;
pub mod session;

pub use config::PodgridConfig;
pub use output::OutputFormat;
pub use session::Session;
