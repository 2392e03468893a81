//! Document persistence.
//!
//! Every handler goes through the [`Store`] trait, which offers one method per
//! document operation on the three collections (users, products, orders).
//! Each method is a single round trip with single-document atomicity; no
//! operation spans documents.
//!
//! - [`postgres::PgStore`] is the production store.
//! - [`memory::MemoryStore`] keeps everything in process, for local runs
//!   without a database and for tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    order::{Order, OrderStatus},
    product::{Product, ProductInput, Review},
    user::{NewUser, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;

    /// Backend name reported by the health endpoint.
    fn kind(&self) -> &'static str;

    // Users

    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Replace the stored hash. Returns false when the user does not exist.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str)
    -> Result<bool, AppError>;

    // Products

    async fn list_products(&self) -> Result<Vec<Product>, AppError>;

    async fn find_product(&self, id: i64) -> Result<Option<Product>, AppError>;

    /// Insert a product. Fails with `Conflict` when the id is taken.
    async fn insert_product(&self, product: Product) -> Result<Product, AppError>;

    /// Overwrite the editable fields, keeping id, reviews and rating.
    async fn update_product(&self, id: i64, input: ProductInput)
    -> Result<Option<Product>, AppError>;

    async fn delete_product(&self, id: i64) -> Result<bool, AppError>;

    /// Append a review and recompute the average rating in one atomic update.
    async fn append_review(&self, id: i64, review: Review) -> Result<Option<Product>, AppError>;

    // Orders

    /// Insert an order. Fails with `Conflict` when the order id is taken.
    async fn insert_order(&self, order: Order) -> Result<Order, AppError>;

    /// All orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, AppError>;

    /// Orders owned by one user, newest first.
    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError>;

    async fn find_order(&self, id: &str) -> Result<Option<Order>, AppError>;

    /// Set the status only if it still equals `expected`.
    ///
    /// Returns `None` when no order with that id has the expected status,
    /// either because it is missing or because another update got there first.
    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Option<Order>, AppError>;

    async fn delete_order(&self, id: &str) -> Result<bool, AppError>;
}
