//! HTTP request handlers (route handlers).
//!
//! Each handler extracts request data, calls into `services` and maps the
//! result to a JSON response. Errors convert through `AppError`.

/// Signup, logins, logout and password changes
pub mod auth;
/// Liveness and store connectivity
pub mod health;
/// Order placement and administration
pub mod orders;
/// Catalog and reviews
pub mod products;
