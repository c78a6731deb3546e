//! finlab: personal finance and portfolio math.
//!
//! Hexagonal architecture: numeric routines in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], subcommand wiring in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
