//! Business logic services.
//!
//! Services contain the rules separated from HTTP handlers. They take the
//! store as `&dyn Store` and return domain values or `AppError`.

pub mod auth_service;
pub mod order_service;
pub mod password;
pub mod product_service;
pub mod session;
