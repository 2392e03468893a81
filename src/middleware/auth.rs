//! Session authentication middleware.
//!
//! Both guards read the session token from the `token` cookie, falling back
//! to an `Authorization: Bearer <token>` header, verify it and insert the
//! resulting [`Session`] into the request extensions. Handlers extract it
//! with `Extension<Session>`.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
    },
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::session::Session,
    services::session::{TOKEN_COOKIE, cookie_value},
    state::AppState,
};

/// Pull the raw session token out of request headers.
///
/// The cookie wins when both are present.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| cookie_value(header, TOKEN_COOKIE))
        .filter(|t| !t.is_empty());
    if let Some(token) = from_cookie {
        return Some(token.to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Takes the already extracted token so no borrow of the request is held
/// across the await.
async fn authenticate(state: &AppState, token: Option<String>) -> Result<Session, AppError> {
    let token = token.ok_or(AppError::Unauthorized)?;
    state.tokens.verify(&token).await
}

/// Any valid session, user or admin.
///
/// Customer-only handlers narrow further with [`Session::user`].
///
/// # Errors
///
/// - 401 `Unauthorized`: no token supplied
/// - 401 `InvalidToken`: bad signature, expired, revoked or malformed claims
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate(&state, extract_token(request.headers())).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// A valid session carrying the admin claim.
///
/// A verified user session is rejected with 403.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate(&state, extract_token(request.headers())).await?;
    if !session.is_admin() {
        tracing::warn!(email = session.email(), "non-admin session on admin route");
        return Err(AppError::Forbidden("Admins only."));
    }
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
