//! # intra_core
//!
//! Core domain logic for Intra: directory authentication, role
//! resolution, user synchronization, and token issuance.

pub mod auth;
pub mod config;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
