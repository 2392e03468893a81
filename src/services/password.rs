//! Argon2id password hashing.
//!
//! Hashing is deliberately expensive, so both operations run on the blocking
//! thread pool instead of stalling the async workers.

use argon2::{
    Argon2, Params,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

/// Hashes and verifies passwords with a fixed set of Argon2 parameters.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHasher {
    /// Use explicit cost parameters (memory in KiB, iterations, lanes).
    pub fn with_params(memory_kib: u32, iterations: u32, lanes: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, lanes, None)
            .map_err(|e| AppError::Internal(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }

    /// Derive a salted PHC hash string.
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
    }

    /// True when `password` matches `hash`. A malformed stored hash never matches.
    ///
    /// Verification uses the parameters encoded in the hash, not this hasher's.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        })
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
    }
}
