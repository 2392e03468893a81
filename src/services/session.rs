//! Stateless session tokens and the cookie that carries them.
//!
//! Tokens are HS256 JWTs signed with the process-wide secret. Validity is a
//! function of the signature and the embedded expiry, plus one extra check:
//! tokens explicitly logged out are kept in a revocation cache until they
//! would have expired anyway.

use std::time::Duration as StdDuration;

use axum::http::HeaderValue;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session::{Session, TokenClaims};

/// Cookie holding the session token, shared by user and admin sessions.
pub const TOKEN_COOKIE: &str = "token";

/// Upper bound on remembered logouts.
const REVOCATION_CAPACITY: u64 = 100_000;

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues, verifies and revokes session tokens.
#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    revoked: Cache<Uuid, ()>,
}

impl SessionTokens {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        // Entries never need to outlive the longest-lived token.
        let cache_ttl = ttl.to_std().unwrap_or(StdDuration::from_secs(24 * 60 * 60));

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            revoked: Cache::builder()
                .max_capacity(REVOCATION_CAPACITY)
                .time_to_live(cache_ttl)
                .build(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `session`, valid from now for the configured lifetime.
    pub fn issue(&self, session: &Session) -> Result<IssuedToken, AppError> {
        self.issue_at(session, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`.
    pub fn issue_at(
        &self,
        session: &Session,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let expires_at = issued_at + self.ttl;
        let claims = TokenClaims::new(session, issued_at.timestamp(), expires_at.timestamp());

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature and expiry and return the embedded claims.
    ///
    /// Does not consult the revocation cache; see [`SessionTokens::verify`].
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AppError> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                AppError::InvalidToken
            })
    }

    /// Full verification: signature, expiry, revocation and claim shape.
    pub async fn verify(&self, token: &str) -> Result<Session, AppError> {
        let claims = self.decode(token)?;
        if self.revoked.contains_key(&claims.jti) {
            return Err(AppError::InvalidToken);
        }
        Session::try_from(claims)
    }

    /// Remember `token` as logged out. Invalid or expired tokens are ignored.
    pub async fn revoke(&self, token: &str) {
        if let Ok(claims) = self.decode(token) {
            self.revoked.insert(claims.jti, ()).await;
        }
    }
}

/// `Set-Cookie` value that stores the session token.
pub fn session_cookie(token: &str, max_age: Duration, secure: bool) -> Result<HeaderValue, AppError> {
    build_cookie(token, max_age.num_seconds().max(0), secure)
}

/// `Set-Cookie` value that makes the browser drop the session token.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    build_cookie("", 0, secure)
}

fn build_cookie(value: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie =
        format!("{TOKEN_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("invalid cookie header: {e}")))
}

/// Find a cookie by name in a `Cookie` request header value.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
