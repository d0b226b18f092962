//! CLI command implementations.

pub mod config;
pub mod phases;
pub mod simulate;
