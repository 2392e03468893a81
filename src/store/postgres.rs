//! PostgreSQL store.
//!
//! Products and orders keep their embedded value objects (variants, reviews,
//! line items, address) in JSONB columns, so each document is still one row
//! and every write below is a single-row statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use super::Store;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::{
    order::{LineItem, Order, OrderStatus, ShippingAddress},
    product::{Product, ProductInput, Review, Variant},
    user::{NewUser, PostalAddress, User},
};

const USER_COLUMNS: &str = "id, name, email, password_hash, addresses, created_at";

const PRODUCT_COLUMNS: &str = "id, name, category, product_type, description, base_price, \
     image, rating, discount, offer_ends_at, variants, reviews";

const ORDER_COLUMNS: &str = "id, user_id, customer, email, placed_at, amount, item_count, \
     items, status, address, payment_method";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Turn a unique-key violation into a `Conflict`, pass everything else through.
fn conflict_on_duplicate(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message()),
        _ => AppError::Database(err),
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    addresses: Json<Vec<PostalAddress>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            addresses: row.addresses.0,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    category: String,
    product_type: String,
    description: String,
    base_price: Decimal,
    image: String,
    rating: f64,
    discount: Decimal,
    offer_ends_at: Option<DateTime<Utc>>,
    variants: Json<Vec<Variant>>,
    reviews: Json<Vec<Review>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = row.category.parse().map_err(|_| {
            AppError::Internal(format!(
                "product {} has unknown category {}",
                row.id, row.category
            ))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            category,
            product_type: row.product_type,
            description: row.description,
            base_price: row.base_price,
            image: row.image,
            rating: row.rating,
            discount: row.discount,
            offer_ends_at: row.offer_ends_at,
            variants: row.variants.0,
            reviews: row.reviews.0,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: Uuid,
    customer: String,
    email: String,
    placed_at: DateTime<Utc>,
    amount: Decimal,
    item_count: i32,
    items: Json<Vec<LineItem>>,
    status: String,
    address: Json<ShippingAddress>,
    payment_method: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, value: &str| {
            AppError::Internal(format!("order {} has invalid {field} {value}", row.id))
        };
        let status = row
            .status
            .parse()
            .map_err(|_| corrupt("status", &row.status))?;
        let payment_method = row
            .payment_method
            .parse()
            .map_err(|_| corrupt("payment method", &row.payment_method))?;
        let items = u32::try_from(row.item_count)
            .map_err(|_| corrupt("item count", &row.item_count.to_string()))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            customer: row.customer,
            email: row.email,
            date: row.placed_at,
            amount: row.amount,
            items,
            item_details: row.items.0,
            status,
            address: row.address.0,
            payment_method,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, AppError> {
    rows.into_iter().map(Product::try_from).collect()
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, AppError> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash, addresses)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Json(&user.addresses))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, || "User already exists".to_string()))?;

        Ok(row.into())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated == 1)
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_products(rows)
    }

    async fn find_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn insert_product(&self, product: Product) -> Result<Product, AppError> {
        let id = product.id;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (
                 id, name, category, product_type, description, base_price,
                 image, rating, discount, offer_ends_at, variants, reviews
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(&product.product_type)
        .bind(&product.description)
        .bind(product.base_price)
        .bind(&product.image)
        .bind(product.rating)
        .bind(product.discount)
        .bind(product.offer_ends_at)
        .bind(Json(&product.variants))
        .bind(Json(&product.reviews))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, || format!("Product {id} already exists")))?;

        row.try_into()
    }

    async fn update_product(
        &self,
        id: i64,
        input: ProductInput,
    ) -> Result<Option<Product>, AppError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products
             SET name = $2, category = $3, product_type = $4, description = $5,
                 base_price = $6, image = $7, discount = $8, offer_ends_at = $9,
                 variants = $10
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.category.as_str())
        .bind(&input.product_type)
        .bind(&input.description)
        .bind(input.base_price)
        .bind(&input.image)
        .bind(input.discount)
        .bind(input.offer_ends_at)
        .bind(Json(&input.variants))
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted == 1)
    }

    async fn append_review(&self, id: i64, review: Review) -> Result<Option<Product>, AppError> {
        // Both SET expressions read the pre-update row, and a concurrent update
        // of the same row re-evaluates them against the committed version.
        sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products
             SET reviews = reviews || jsonb_build_array($2::jsonb),
                 rating = (
                     SELECT AVG((r->>'rating')::float8)
                     FROM jsonb_array_elements(reviews || jsonb_build_array($2::jsonb)) AS r
                 )
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(&review))
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn insert_order(&self, order: Order) -> Result<Order, AppError> {
        let order_id = order.id.clone();
        let item_count = i32::try_from(order.items)
            .map_err(|_| AppError::Validation("Too many line items".into()))?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO orders (
                 id, user_id, customer, email, placed_at, amount, item_count,
                 items, status, address, payment_method
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.id)
        .bind(order.user_id)
        .bind(&order.customer)
        .bind(&order.email)
        .bind(order.date)
        .bind(order.amount)
        .bind(item_count)
        .bind(Json(&order.item_details))
        .bind(order.status.as_str())
        .bind(Json(&order.address))
        .bind(order.payment_method.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, || format!("Order {order_id} already exists")))?;

        row.try_into()
    }

    async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY placed_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY placed_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    async fn find_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Option<Order>, AppError> {
        sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $3
             WHERE id = $1 AND status = $2
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Order::try_from)
        .transpose()
    }

    async fn delete_order(&self, id: &str) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted == 1)
    }
}
