//! HTTP middleware components.

/// Session authentication guards
pub mod auth;
