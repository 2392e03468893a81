//! Order HTTP handlers.
//!
//! Customer routes:
//! - POST /api/orders - Place an order
//! - GET /api/orders/user - List the caller's orders
//! - GET /api/orders/{id} - Fetch one order (owner or admin)
//!
//! Admin routes:
//! - GET /api/orders - List every order
//! - PUT /api/orders/{id} - Change an order's status
//! - DELETE /api/orders/{id} - Delete an order

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
        order::{CreateOrderRequest, Order, UpdateStatusRequest},
        session::Session,
    },
    services::order_service,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct OrderEnvelope {
    pub message: &'static str,
    pub order: Order,
}

/// Place an order for the calling customer.
///
/// # Request Body
///
/// ```json
/// {
///   "customer": "A",
///   "email": "a@x.com",
///   "amount": 240,
///   "itemDetails": [{ "productId": 1, "quantity": 2, "price": 100 }],
///   "address": { "fullName": "A", "phoneNumber": "9999999999", "addressLine1": "1 Loom St",
///                "city": "Surat", "state": "GJ", "pincode": "395003" },
///   "paymentMethod": "cod"
/// }
/// ```
///
/// Unit prices and `amount` are optional; when present they must match the
/// catalog within 0.01.
///
/// # Response
///
/// - **201 Created**: `{ "message": "Order created successfully", "order": {...} }`
/// - **400**: validation failure or price mismatch
/// - **403**: admin session
pub async fn create_order(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(request): AppJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderEnvelope>), AppError> {
    let owner = session.user()?;
    let order =
        order_service::create_order(state.store.as_ref(), &state.orders, owner, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderEnvelope {
            message: "Order created successfully",
            order,
        }),
    ))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Order>>, AppError> {
    let owner = session.user()?;
    let orders = order_service::list_for_user(state.store.as_ref(), owner).await?;
    Ok(Json(orders))
}

/// Fetch one order. Another customer's order reads as 404.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppPath(id): AppPath<String>,
) -> Result<Json<Order>, AppError> {
    let order = order_service::get_order(state.store.as_ref(), &session, &id).await?;
    Ok(Json(order))
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, AppError> {
    let orders = order_service::list_all(state.store.as_ref()).await?;
    Ok(Json(orders))
}

/// Change an order's status.
///
/// # Response
///
/// - **200 OK**: `{ "message": "Order status updated", "order": {...} }`
/// - **400**: unknown status name
/// - **404**: no such order
/// - **422**: the lifecycle does not allow the move
pub async fn update_order_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
    AppJson(request): AppJson<UpdateStatusRequest>,
) -> Result<Json<OrderEnvelope>, AppError> {
    let order = order_service::update_status(state.store.as_ref(), &id, &request.status).await?;

    Ok(Json(OrderEnvelope {
        message: "Order status updated",
        order,
    }))
}

pub async fn delete_order(
    State(state): State<AppState>,
    AppPath(id): AppPath<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    order_service::delete_order(state.store.as_ref(), &id).await?;
    Ok(Json(json!({ "message": "Order deleted successfully" })))
}
