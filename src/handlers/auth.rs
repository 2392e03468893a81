//! Authentication HTTP handlers.
//!
//! - POST /api/auth/signup - Register a customer
//! - POST /api/auth/login - Customer login, sets the session cookie
//! - POST /api/auth/admin-login - Administrator login, sets the session cookie
//! - POST /api/auth/logout - Revoke the session and clear the cookie
//! - POST /api/auth/change-password - Rotate the caller's password
//! - GET /api/auth/me - Current customer identity
//! - GET /api/auth/admin/me - Current admin identity

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    error::AppError,
    extract::AppJson,
    middleware::auth::extract_token,
    models::{
        session::{AdminIdentity, Session, UserIdentity},
        user::{ChangePasswordRequest, LoginRequest, RegisterRequest, UserResponse},
    },
    services::{
        auth_service,
        session::{clear_session_cookie, session_cookie},
    },
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub message: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct AdminEnvelope {
    pub message: &'static str,
    pub admin: AdminIdentity,
}

/// Register a new customer.
///
/// # Response
///
/// - **201 Created**: `{ "message": "User registered successfully", "user": {id, name, email} }`
/// - **400**: validation failure
/// - **409**: email already registered
pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), AppError> {
    let user = auth_service::register(state.store.as_ref(), &state.passwords, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User registered successfully",
            user: user.into(),
        }),
    ))
}

/// Customer login.
///
/// On success the session token is returned as an HTTP-only `token` cookie.
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth_service::login(state.store.as_ref(), &state.passwords, request).await?;

    let session = Session::User(UserIdentity {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    });
    let issued = state.tokens.issue(&session)?;
    let cookie = session_cookie(&issued.token, state.tokens.ttl(), state.secure_cookies)?;

    Ok((
        [(SET_COOKIE, cookie)],
        Json(UserEnvelope {
            message: "Login successful",
            user: user.into(),
        }),
    ))
}

/// Administrator login against the configured credential.
pub async fn admin_login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = auth_service::admin_login(&state.admin, &state.passwords, request).await?;

    let issued = state.tokens.issue(&session)?;
    let cookie = session_cookie(&issued.token, state.tokens.ttl(), state.secure_cookies)?;

    Ok((
        [(SET_COOKIE, cookie)],
        Json(AdminEnvelope {
            message: "Admin login successful",
            admin: AdminIdentity {
                email: session.email().to_string(),
                is_admin: true,
            },
        }),
    ))
}

/// Log out.
///
/// Needs no session. A token found in the cookie or a Bearer header is
/// revoked so it stops verifying before its natural expiry.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = extract_token(&headers) {
        state.tokens.revoke(&token).await;
    }

    Ok((
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies)?)],
        Json(json!({ "message": "Logout successful" })),
    ))
}

/// Rotate the caller's password. Customer sessions only.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let identity = session.user()?;
    auth_service::change_password(state.store.as_ref(), &state.passwords, identity, request)
        .await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

pub async fn me(Extension(session): Extension<Session>) -> Result<Json<UserIdentity>, AppError> {
    Ok(Json(session.user()?.clone()))
}

pub async fn admin_me(Extension(session): Extension<Session>) -> Result<Json<AdminIdentity>, AppError> {
    match session {
        Session::Admin(admin) => Ok(Json(admin)),
        Session::User(_) => Err(AppError::Forbidden("Admins only.")),
    }
}
