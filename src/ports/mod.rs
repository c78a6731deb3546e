//! Port traits the CLI wires to concrete adapters.

pub mod config_port;
pub mod data_port;
pub mod report_port;
