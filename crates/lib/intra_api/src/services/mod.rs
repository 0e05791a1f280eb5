//! API-layer services.

pub mod cookies;
