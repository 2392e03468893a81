//! Textile storefront backend.
//!
//! REST API for a clothing storefront: catalog, customer accounts, cookie
//! sessions and order management.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: PostgreSQL with sqlx, or an in-memory store when no database is configured
//! - **Authentication**: Argon2 password hashes, HS256 session tokens in an HTTP-only cookie
//! - **Format**: JSON requests/responses

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the full HTTP router.
///
/// Routes fall into three groups: public, customer (any valid session) and
/// admin. Paths shared between groups are merged per method.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/admin-login", post(handlers::auth::admin_login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/products", get(handlers::products::list_products))
        .route("/api/products/{id}", get(handlers::products::get_product));

    let user_routes = Router::new()
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/orders", post(handlers::orders::create_order))
        .route("/api/orders/user", get(handlers::orders::list_my_orders))
        .route("/api/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/api/products/{id}/review",
            post(handlers::products::add_review),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user,
        ));

    let admin_routes = Router::new()
        .route("/api/auth/admin/me", get(handlers::auth::admin_me))
        .route("/api/orders", get(handlers::orders::list_orders))
        .route(
            "/api/orders/{id}",
            put(handlers::orders::update_order_status)
                .delete(handlers::orders::delete_order),
        )
        .route("/api/products", post(handlers::products::create_product))
        .route(
            "/api/products/{id}",
            put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin,
        ));

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
