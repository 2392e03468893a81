use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use textile_storefront::{
    app,
    config::Config,
    models::session::{Session, UserIdentity},
    services::{password::PasswordHasher, session::SessionTokens},
    state::AppState,
    store::MemoryStore,
};

const JWT_SECRET: &str = "integration-test-secret-0123456789";
const ADMIN_EMAIL: &str = "admin@storefront.test";
const ADMIN_PASSWORD: &str = "admin-pass";

async fn setup() -> Router {
    let config = Config::from_pairs(
        [
            ("JWT_SECRET", JWT_SECRET),
            ("ADMIN_EMAIL", ADMIN_EMAIL),
            ("ADMIN_PASSWORD", ADMIN_PASSWORD),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string())),
    )
    .unwrap();

    let passwords = PasswordHasher::with_params(8, 1, 1).unwrap();
    let state = AppState::from_config(&config, Arc::new(MemoryStore::new()), passwords)
        .await
        .unwrap();
    app(state)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply { status, headers, body }
}

/// The `token` value from a `Set-Cookie` response header.
fn session_token(headers: &HeaderMap) -> String {
    let cookie = headers
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("token="))
        .expect("token cookie")
        .to_string()
}

async fn register_and_login(app: &Router, name: &str, email: &str) -> String {
    let reply = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);

    let reply = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    session_token(&reply.headers)
}

async fn admin_token(app: &Router) -> String {
    let reply = send(
        app,
        "POST",
        "/api/auth/admin-login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["admin"]["is_admin"], true);
    session_token(&reply.headers)
}

async fn seed_product(app: &Router, admin: &str, id: i64, base_price: u32) {
    let reply = send(
        app,
        "POST",
        "/api/products",
        Some(admin),
        Some(json!({
            "id": id,
            "name": "Handloom Kurta",
            "category": "Men",
            "type": "Kurta",
            "basePrice": base_price,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
}

fn order_body(product_id: i64, price: u32, quantity: u32, amount: u32) -> Value {
    json!({
        "customer": "A",
        "email": "a@x.com",
        "amount": amount,
        "itemDetails": [{ "productId": product_id, "name": "Handloom Kurta", "price": price, "quantity": quantity }],
        "address": {
            "fullName": "A",
            "phoneNumber": "9876543210",
            "addressLine1": "12 Loom Street",
            "city": "Surat",
            "state": "Gujarat",
            "pincode": "395003"
        },
        "paymentMethod": "cod"
    })
}

#[tokio::test]
async fn signup_then_login_sets_cookie() {
    let app = setup().await;

    let reply = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": "A", "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["user"]["name"], "A");
    assert_eq!(reply.body["user"]["email"], "a@x.com");
    assert!(reply.body["user"]["id"].is_string());
    assert!(reply.body["user"].get("password_hash").is_none());

    let reply = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Login successful");
    assert_eq!(reply.body["user"]["email"], "a@x.com");

    let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(!cookie.contains("Secure"));

    let token = session_token(&reply.headers);
    let reply = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["email"], "a@x.com");
}

#[tokio::test]
async fn login_failures() {
    let app = setup().await;
    register_and_login(&app, "A", "a@x.com").await;

    let reply = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Invalid credentials");
    assert!(reply.headers.get(header::SET_COOKIE).is_none());

    let reply = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "b@x.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "User not found");
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = setup().await;
    register_and_login(&app, "A", "a@x.com").await;

    let reply = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "name": "B", "email": "A@X.com", "password": "secret2" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["code"], "conflict");
}

#[tokio::test]
async fn order_amount_adds_shipping() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 1, 100).await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "POST", "/api/orders", Some(&user), Some(order_body(1, 100, 2, 240))).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["message"], "Order created successfully");

    let order = &reply.body["order"];
    assert_eq!(order["amount"].as_f64(), Some(240.0));
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["items"], 1);
    assert!(order["id"].as_str().unwrap().starts_with("ORD-"));

    let reply = send(&app, "GET", "/api/orders/user", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn order_with_tampered_price_is_rejected() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 1, 100).await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "POST", "/api/orders", Some(&user), Some(order_body(1, 10, 2, 60))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "validation_error");
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let app = setup().await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "GET", "/api/orders/ORD-0000000000", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Order not found");
}

#[tokio::test]
async fn orders_are_visible_to_owner_and_admin_only() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 1, 100).await;
    let owner = register_and_login(&app, "A", "a@x.com").await;
    let other = register_and_login(&app, "B", "b@x.com").await;

    let reply = send(&app, "POST", "/api/orders", Some(&owner), Some(order_body(1, 100, 1, 140))).await;
    let id = reply.body["order"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/orders/{id}");

    assert_eq!(send(&app, "GET", &uri, Some(&owner), None).await.status, StatusCode::OK);
    assert_eq!(send(&app, "GET", &uri, Some(&admin), None).await.status, StatusCode::OK);
    assert_eq!(send(&app, "GET", &uri, Some(&other), None).await.status, StatusCode::NOT_FOUND);

    let reply = send(&app, "GET", "/api/orders/user", Some(&other), None).await;
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn user_token_on_admin_route_is_forbidden() {
    let app = setup().await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "DELETE", "/api/orders/ORD-0000000001", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["message"], "Access denied. Admins only.");

    let reply = send(&app, "GET", "/api/orders", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_token_on_customer_route_is_forbidden() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 1, 100).await;

    let reply = send(&app, "POST", "/api/orders", Some(&admin), Some(order_body(1, 100, 1, 140))).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = send(&app, "GET", "/api/auth/admin/me", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn status_follows_lifecycle() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 1, 100).await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "POST", "/api/orders", Some(&user), Some(order_body(1, 100, 2, 240))).await;
    let uri = format!("/api/orders/{}", reply.body["order"]["id"].as_str().unwrap());

    let reply = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "Shipped" }))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Order status updated");
    assert_eq!(reply.body["order"]["status"], "Shipped");

    let reply = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "Delivered" }))).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "Pending" }))).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["code"], "invalid_transition");

    let reply = send(&app, "DELETE", &uri, Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Order deleted successfully");
    assert_eq!(send(&app, "DELETE", &uri, Some(&admin), None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reviews_update_average_rating() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 7, 500).await;
    let user = register_and_login(&app, "Meera", "meera@x.com").await;

    let mut last = Value::Null;
    for rating in [5, 3, 4] {
        let reply = send(
            &app,
            "POST",
            "/api/products/7/review",
            Some(&user),
            Some(json!({ "rating": rating, "comment": "good weave" })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["review"]["username"], "Meera");
        last = reply.body;
    }
    assert_eq!(last["rating"].as_f64(), Some(4.0));
    assert_eq!(last["reviews"].as_array().unwrap().len(), 3);

    let reply = send(
        &app,
        "POST",
        "/api/products/7/review",
        Some(&user),
        Some(json!({ "rating": 6 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(&app, "GET", "/api/products/7", None, None).await;
    assert_eq!(reply.body["rating"].as_f64(), Some(4.0));
}

#[tokio::test]
async fn product_crud() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 3, 800).await;

    let reply = send(
        &app,
        "PUT",
        "/api/products/3",
        Some(&admin),
        Some(json!({ "name": "Silk Kurta", "category": "Men", "type": "Kurta", "basePrice": 900, "discount": 10 })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["product"]["name"], "Silk Kurta");

    let reply = send(&app, "GET", "/api/products", None, None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);

    let reply = send(&app, "DELETE", "/api/products/3", Some(&admin), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(&app, "GET", "/api/products/3", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Product not found");
}

#[tokio::test]
async fn logout_revokes_token() {
    let app = setup().await;
    let token = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Logout successful");
    let cleared = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let reply = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "invalid_token");
}

#[tokio::test]
async fn missing_and_expired_tokens_are_unauthorized() {
    let app = setup().await;

    let reply = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Access denied. No token provided.");

    let tokens = SessionTokens::new(&SecretString::from(JWT_SECRET.to_string()), Duration::hours(24));
    let session = Session::User(UserIdentity {
        id: uuid::Uuid::new_v4(),
        name: "A".into(),
        email: "a@x.com".into(),
    });
    let expired = tokens
        .issue_at(&session, Utc::now() - Duration::hours(25))
        .unwrap();

    let reply = send(&app, "GET", "/api/auth/me", Some(&expired.token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "invalid_token");

    let fresh = tokens.issue(&session).unwrap();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", fresh.token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_store() {
    let app = setup().await;
    let reply = send(&app, "GET", "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert_eq!(reply.body["store"], "memory");
}

async fn send_bearer(app: &Router, method: &str, uri: &str, token: &str) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body: serde_json::from_slice(&bytes).unwrap(),
    }
}

#[tokio::test]
async fn extractor_rejections_are_json() {
    let app = setup().await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let reply = send(&app, "GET", "/api/products/abc", None, None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "validation_error");
    assert!(reply.body["message"].is_string());

    let reply = send(&app, "POST", "/api/orders", Some(&user), Some(json!({ "itemDetails": [] }))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "validation_error");
    assert!(reply.body["message"].as_str().unwrap().contains("address"));
}

#[tokio::test]
async fn oversized_order_is_rejected_with_message() {
    let app = setup().await;
    let admin = admin_token(&app).await;
    seed_product(&app, &admin, 1, 10_000).await;
    let user = register_and_login(&app, "A", "a@x.com").await;

    let mut body = order_body(1, 10_000, 1, 10_040);
    body["itemDetails"][0]["quantity"] = json!(4_000_000_000u32);
    body["amount"] = json!(-7.92281625142643e28);

    let reply = send(&app, "POST", "/api/orders", Some(&user), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "validation_error");

    let mut body = order_body(1, 10_000, 1, 10_040);
    body["amount"] = json!(-7.92281625142643e28);
    let reply = send(&app, "POST", "/api/orders", Some(&user), Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(&app, "GET", "/api/orders/user", Some(&user), None).await;
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn logout_revokes_bearer_token() {
    let app = setup().await;
    let token = register_and_login(&app, "A", "a@x.com").await;

    assert_eq!(send_bearer(&app, "GET", "/api/auth/me", &token).await.status, StatusCode::OK);

    let reply = send_bearer(&app, "POST", "/api/auth/logout", &token).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send_bearer(&app, "GET", "/api/auth/me", &token).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["code"], "invalid_token");
}

#[tokio::test]
async fn unknown_order_status_update_is_not_found() {
    let app = setup().await;
    let admin = admin_token(&app).await;

    let reply = send(
        &app,
        "PUT",
        "/api/orders/ORD-0000000000",
        Some(&admin),
        Some(json!({ "status": "Teleported" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Order not found");
}
