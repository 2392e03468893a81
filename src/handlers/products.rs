//! Catalog HTTP handlers.
//!
//! - GET /api/products - List products (public)
//! - GET /api/products/{id} - Fetch a product (public)
//! - POST /api/products - Create a product (admin)
//! - PUT /api/products/{id} - Replace a product's editable fields (admin)
//! - DELETE /api/products/{id} - Delete a product (admin)
//! - POST /api/products/{id}/review - Review a product (customer)

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    models::{
        product::{Product, ProductInput, Review, ReviewRequest},
        session::Session,
    },
    services::product_service,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct ReviewEnvelope {
    pub message: &'static str,
    pub review: Review,
    pub rating: f64,
    pub reviews: Vec<Review>,
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = product_service::list_products(state.store.as_ref()).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Product>, AppError> {
    let product = product_service::get_product(state.store.as_ref(), id).await?;
    Ok(Json(product))
}

/// Create a product.
///
/// `id` may be supplied; otherwise one is generated.
///
/// # Response
///
/// - **201 Created**: `{ "message": "Product created successfully", "product": {...} }`
/// - **409**: id already in use
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(input): AppJson<ProductInput>,
) -> Result<(StatusCode, Json<ProductEnvelope>), AppError> {
    let product = product_service::create_product(state.store.as_ref(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductEnvelope {
            message: "Product created successfully",
            product,
        }),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(input): AppJson<ProductInput>,
) -> Result<Json<ProductEnvelope>, AppError> {
    let product = product_service::update_product(state.store.as_ref(), id, input).await?;

    Ok(Json(ProductEnvelope {
        message: "Product updated successfully",
        product,
    }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    product_service::delete_product(state.store.as_ref(), id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

/// Review a product as the calling customer.
///
/// # Response
///
/// - **201 Created**: the new review plus the product's recomputed `rating`
///   and full `reviews` list
/// - **400**: rating outside 1-5
/// - **404**: no such product
pub async fn add_review(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppPath(id): AppPath<i64>,
    AppJson(request): AppJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewEnvelope>), AppError> {
    let reviewer = session.user()?;
    let (review, product) =
        product_service::add_review(state.store.as_ref(), reviewer, id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewEnvelope {
            message: "Review added successfully",
            review,
            rating: product.rating,
            reviews: product.reviews,
        }),
    ))
}
