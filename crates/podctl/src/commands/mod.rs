//! One module per resource kind. Every command returns the text to print.

pub mod control_loop;
pub mod demo;
pub mod deploy;
pub mod node;
pub mod pod;
pub mod service;
pub mod state;
pub mod status;
