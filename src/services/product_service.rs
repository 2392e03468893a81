//! Catalog maintenance and reviews.

use chrono::Utc;
use rand::Rng;

use crate::{
    error::AppError,
    models::{
        product::{Product, ProductInput, Review, ReviewRequest},
        session::UserIdentity,
    },
    store::Store,
};

const MAX_ID_ATTEMPTS: usize = 3;

/// Millisecond timestamp followed by three random digits.
pub fn generate_product_id() -> i64 {
    let jitter: i64 = rand::rng().random_range(0..1000);
    Utc::now().timestamp_millis() * 1000 + jitter
}

pub async fn list_products(store: &dyn Store) -> Result<Vec<Product>, AppError> {
    store.list_products().await
}

pub async fn get_product(store: &dyn Store, id: i64) -> Result<Product, AppError> {
    store
        .find_product(id)
        .await?
        .ok_or(AppError::NotFound("Product"))
}

/// Add a product. An explicit id is kept; a missing one is generated.
pub async fn create_product(store: &dyn Store, input: ProductInput) -> Result<Product, AppError> {
    input.validate()?;

    if let Some(id) = input.id {
        let product = store.insert_product(input.into_product(id)).await?;
        tracing::info!(product_id = product.id, "product created");
        return Ok(product);
    }

    for attempt in 1..=MAX_ID_ATTEMPTS {
        match store
            .insert_product(input.clone().into_product(generate_product_id()))
            .await
        {
            Ok(product) => {
                tracing::info!(product_id = product.id, "product created");
                return Ok(product);
            }
            Err(AppError::Conflict(_)) if attempt < MAX_ID_ATTEMPTS => continue,
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal("could not allocate a product id".into()))
}

pub async fn update_product(
    store: &dyn Store,
    id: i64,
    input: ProductInput,
) -> Result<Product, AppError> {
    input.validate()?;
    let product = store
        .update_product(id, input)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    tracing::info!(product_id = id, "product updated");
    Ok(product)
}

pub async fn delete_product(store: &dyn Store, id: i64) -> Result<(), AppError> {
    if !store.delete_product(id).await? {
        return Err(AppError::NotFound("Product"));
    }
    tracing::info!(product_id = id, "product deleted");
    Ok(())
}

/// Append a review under the reviewer's display name.
///
/// Returns the stored review and the product with its recomputed rating.
pub async fn add_review(
    store: &dyn Store,
    reviewer: &UserIdentity,
    id: i64,
    request: ReviewRequest,
) -> Result<(Review, Product), AppError> {
    let review = request.into_review(reviewer.name.clone())?;
    let product = store
        .append_review(id, review.clone())
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    tracing::info!(product_id = id, rating = review.rating, average = product.rating, "review added");
    Ok((review, product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn input(id: Option<i64>) -> ProductInput {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Block Print Dupatta",
            "category": "Women",
            "type": "Dupatta",
            "basePrice": 350,
            "discount": 15,
        }))
        .unwrap()
    }

    fn reviewer() -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            name: "Meera".into(),
            email: "meera@x.com".into(),
        }
    }

    #[tokio::test]
    async fn create_generates_id_when_missing() {
        let store = MemoryStore::new();
        let product = create_product(&store, input(None)).await.unwrap();
        assert!(product.id > 0);
        assert_eq!(product.base_price, Decimal::from(350));
        assert_eq!(get_product(&store, product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn explicit_id_conflicts_on_reuse() {
        let store = MemoryStore::new();
        create_product(&store, input(Some(5))).await.unwrap();
        assert!(matches!(
            create_product(&store, input(Some(5))).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_keeps_reviews() {
        let store = MemoryStore::new();
        create_product(&store, input(Some(5))).await.unwrap();
        add_review(&store, &reviewer(), 5, ReviewRequest { rating: 4, comment: "nice".into() })
            .await
            .unwrap();

        let mut changed = input(None);
        changed.name = "Block Print Stole".into();
        let updated = update_product(&store, 5, changed).await.unwrap();
        assert_eq!(updated.name, "Block Print Stole");
        assert_eq!(updated.reviews.len(), 1);
        assert!((updated.rating - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rating_is_mean_of_reviews() {
        let store = MemoryStore::new();
        create_product(&store, input(Some(9))).await.unwrap();

        let ratings = [5u8, 3, 4, 1];
        let mut last = None;
        for rating in ratings {
            let (review, product) = add_review(
                &store,
                &reviewer(),
                9,
                ReviewRequest { rating, comment: String::new() },
            )
            .await
            .unwrap();
            assert_eq!(review.username, "Meera");
            last = Some(product);
        }

        let product = last.unwrap();
        assert_eq!(product.reviews.len(), ratings.len());
        assert!((product.rating - 13.0 / 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_product_operations_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(get_product(&store, 1).await, Err(AppError::NotFound("Product"))));
        assert!(matches!(delete_product(&store, 1).await, Err(AppError::NotFound("Product"))));
        assert!(matches!(
            update_product(&store, 1, input(None)).await,
            Err(AppError::NotFound("Product"))
        ));
        assert!(matches!(
            add_review(&store, &reviewer(), 1, ReviewRequest { rating: 5, comment: String::new() }).await,
            Err(AppError::NotFound("Product"))
        ));
    }
}
