//! Application configuration management.
//!
//! Configuration is read once at startup from environment variables (with an
//! optional `.env` file) using `envy`, then frozen. Secrets are wrapped in
//! `SecretString` so they never show up in `Debug` output or logs.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Shortest accepted token signing secret.
const MIN_JWT_SECRET_LENGTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Either ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set")]
    MissingAdminPassword,

    #[error("Insecure JWT_SECRET: must be at least {MIN_JWT_SECRET_LENGTH} characters")]
    InsecureJwtSecret,
}

/// Deployment flavour. Production turns on the `Secure` cookie flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

/// How the administrator password is supplied.
#[derive(Debug, Clone)]
pub enum AdminPassword {
    /// Argon2 PHC string, used as-is
    Hash(String),
    /// Plaintext, hashed once at startup
    Plain(SecretString),
}

/// Raw environment, as `envy` sees it. Field names map to upper-case variables.
#[derive(Deserialize)]
struct EnvConfig {
    database_url: Option<String>,

    #[serde(default = "default_port")]
    server_port: u16,

    jwt_secret: String,
    admin_email: String,
    admin_password_hash: Option<String>,
    admin_password: Option<String>,

    #[serde(default)]
    app_env: AppEnv,

    #[serde(default = "default_shipping_fee")]
    shipping_fee: u32,

    #[serde(default = "default_session_ttl_hours")]
    session_ttl_hours: u32,
}

/// Application configuration.
///
/// # Environment Variables
///
/// - `JWT_SECRET` (required): session token signing secret
/// - `ADMIN_EMAIL` (required): administrator login
/// - `ADMIN_PASSWORD_HASH` or `ADMIN_PASSWORD` (one required)
/// - `DATABASE_URL` (optional): PostgreSQL URL, in-memory store when absent
/// - `SERVER_PORT` (optional): defaults to 5000
/// - `APP_ENV` (optional): `development` (default) or `production`
/// - `SHIPPING_FEE` (optional): flat shipping charge, defaults to 40
/// - `SESSION_TTL_HOURS` (optional): token lifetime, defaults to 24
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<SecretString>,
    pub server_port: u16,
    pub jwt_secret: SecretString,
    pub admin_email: String,
    pub admin_password: AdminPassword,
    pub app_env: AppEnv,
    pub shipping_fee: Decimal,
    pub session_ttl_hours: u32,
}

fn default_port() -> u16 {
    5000
}

fn default_shipping_fee() -> u32 {
    40
}

fn default_session_ttl_hours() -> u32 {
    24
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into the expected types
    /// - No admin password is configured or the signing secret is too short
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        Self::from_raw(envy::from_env::<EnvConfig>()?)
    }

    /// Same as [`Config::from_env`] but reads from an explicit list of pairs.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::from_raw(envy::from_iter::<_, EnvConfig>(pairs)?)
    }

    fn from_raw(raw: EnvConfig) -> Result<Self, ConfigError> {
        let admin_password = match (raw.admin_password_hash, raw.admin_password) {
            (Some(hash), _) if !hash.trim().is_empty() => AdminPassword::Hash(hash),
            (_, Some(plain)) if !plain.is_empty() => AdminPassword::Plain(plain.into()),
            _ => return Err(ConfigError::MissingAdminPassword),
        };

        let jwt_secret = SecretString::from(raw.jwt_secret);
        if jwt_secret.expose_secret().len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InsecureJwtSecret);
        }

        Ok(Self {
            database_url: raw
                .database_url
                .filter(|url| !url.trim().is_empty())
                .map(SecretString::from),
            server_port: raw.server_port,
            jwt_secret,
            admin_email: crate::models::user::normalize_email(&raw.admin_email),
            admin_password,
            app_env: raw.app_env,
            shipping_fee: Decimal::from(raw.shipping_fee),
            session_ttl_hours: raw.session_ttl_hours,
        })
    }

    /// Cookies get the `Secure` flag outside local development.
    pub fn secure_cookies(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}
