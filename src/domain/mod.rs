//! Core domain types and numeric routines.

pub mod error;
pub mod prices;
pub mod returns;
pub mod portfolio;
pub mod frontier;
pub mod bond;
pub mod compound;
pub mod clustering;
pub mod index_compare;
pub mod config_validation;
