//! Domain layer for the cartguard widget controller
//!
//! This module contains the widget state model and the collaborator ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
