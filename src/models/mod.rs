//! Data models representing stored documents and API payloads.

/// Order documents and the status lifecycle
pub mod order;
/// Catalog documents
pub mod product;
/// Request identity and token claims
pub mod session;
/// Customer accounts
pub mod user;
