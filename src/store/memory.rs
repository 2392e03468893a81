//! In-process store backed by hash maps.
//!
//! Thread-safe via `tokio::sync::RwLock`. Each trait method takes the lock
//! once, so every operation is atomic with respect to the others. Data is
//! lost when the store is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::AppError;
use crate::models::{
    order::{Order, OrderStatus},
    product::{Product, ProductInput, Review, average_rating},
    user::{NewUser, User},
};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    products: HashMap<i64, Product>,
    orders: HashMap<String, Order>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    orders
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut data = self.data.write().await;
        if data.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("User already exists".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            addresses: user.addresses,
            created_at: Utc::now(),
        };
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let data = self.data.read().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.data.read().await.users.get(&id).cloned())
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        match data.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let data = self.data.read().await;
        let mut products: Vec<Product> = data.products.values().cloned().collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn find_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        Ok(self.data.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, product: Product) -> Result<Product, AppError> {
        let mut data = self.data.write().await;
        if data.products.contains_key(&product.id) {
            return Err(AppError::Conflict(format!(
                "Product {} already exists",
                product.id
            )));
        }
        data.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        input: ProductInput,
    ) -> Result<Option<Product>, AppError> {
        let mut data = self.data.write().await;
        let Some(product) = data.products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = input.name;
        product.category = input.category;
        product.product_type = input.product_type;
        product.description = input.description;
        product.base_price = input.base_price;
        product.image = input.image;
        product.discount = input.discount;
        product.offer_ends_at = input.offer_ends_at;
        product.variants = input.variants;
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.data.write().await.products.remove(&id).is_some())
    }

    async fn append_review(&self, id: i64, review: Review) -> Result<Option<Product>, AppError> {
        let mut data = self.data.write().await;
        let Some(product) = data.products.get_mut(&id) else {
            return Ok(None);
        };
        product.reviews.push(review);
        product.rating = average_rating(&product.reviews);
        Ok(Some(product.clone()))
    }

    async fn insert_order(&self, order: Order) -> Result<Order, AppError> {
        let mut data = self.data.write().await;
        if data.orders.contains_key(&order.id) {
            return Err(AppError::Conflict(format!("Order {} already exists", order.id)));
        }
        data.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        let data = self.data.read().await;
        Ok(newest_first(data.orders.values().cloned().collect()))
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        let data = self.data.read().await;
        Ok(newest_first(
            data.orders
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.data.read().await.orders.get(id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> Result<Option<Order>, AppError> {
        let mut data = self.data.write().await;
        match data.orders.get_mut(id) {
            Some(order) if order.status == expected => {
                order.status = status;
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_order(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.data.write().await.orders.remove(id).is_some())
    }
}
