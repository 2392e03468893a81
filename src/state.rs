//! Shared application state handed to every handler and middleware.

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;

use crate::config::{AdminPassword, Config};
use crate::error::AppError;
use crate::services::{password::PasswordHasher, session::SessionTokens};
use crate::store::Store;

/// The fixed administrator credential.
#[derive(Debug, Clone)]
pub struct AdminCredential {
    pub email: String,
    pub password_hash: String,
}

/// Checkout settings that are constant for the process lifetime.
#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub shipping_fee: Decimal,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: SessionTokens,
    pub passwords: PasswordHasher,
    pub admin: Arc<AdminCredential>,
    pub orders: OrderSettings,
    pub secure_cookies: bool,
}

impl AppState {
    /// Build the state from configuration, hashing a plaintext admin password once.
    pub async fn from_config(
        config: &Config,
        store: Arc<dyn Store>,
        passwords: PasswordHasher,
    ) -> Result<Self, AppError> {
        let password_hash = match &config.admin_password {
            AdminPassword::Hash(hash) => hash.clone(),
            AdminPassword::Plain(plain) => {
                use secrecy::ExposeSecret;
                passwords.hash(plain.expose_secret()).await?
            }
        };

        Ok(Self {
            store,
            tokens: SessionTokens::new(
                &config.jwt_secret,
                Duration::hours(i64::from(config.session_ttl_hours)),
            ),
            passwords,
            admin: Arc::new(AdminCredential {
                email: config.admin_email.clone(),
                password_hash,
            }),
            orders: OrderSettings {
                shipping_fee: config.shipping_fee,
            },
            secure_cookies: config.secure_cookies(),
        })
    }
}
