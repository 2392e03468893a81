//! Credential checks: registration, logins and password changes.
//!
//! Token signing lives in [`crate::services::session`]; this module decides
//! *whether* a session may be issued.

use crate::{
    error::AppError,
    models::{
        session::{Session, UserIdentity},
        user::{
            ChangePasswordRequest, LoginRequest, MIN_PASSWORD_LEN, NewUser, RegisterRequest, User,
            is_valid_email, normalize_email,
        },
    },
    services::password::PasswordHasher,
    state::AdminCredential,
    store::Store,
};

fn check_password_strength(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Register a new customer.
///
/// # Errors
///
/// - `Validation`: empty name, malformed email, short password, bad address
/// - `Conflict`: email already registered
pub async fn register(
    store: &dyn Store,
    passwords: &PasswordHasher,
    request: RegisterRequest,
) -> Result<User, AppError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let email = normalize_email(&request.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!("{email} is not a valid email!")));
    }
    check_password_strength(&request.password)?;
    for address in &request.addresses {
        address.validate()?;
    }

    // Cheap pre-check so the expensive hash is skipped for known emails.
    // The store's unique index remains the real guard.
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = passwords.hash(&request.password).await?;

    let user = store
        .insert_user(NewUser {
            name,
            email,
            password_hash,
            addresses: request.addresses,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Check a customer's credentials and return the session to issue.
///
/// # Errors
///
/// - `NotFound("User")`: no account with that email
/// - `InvalidCredentials`: wrong password
pub async fn login(
    store: &dyn Store,
    passwords: &PasswordHasher,
    request: LoginRequest,
) -> Result<User, AppError> {
    let email = normalize_email(&request.email);
    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !passwords.verify(&request.password, &user.password_hash).await? {
        tracing::warn!(user_id = %user.id, "login rejected: wrong password");
        return Err(AppError::InvalidCredentials("Invalid credentials"));
    }

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Check the administrator credential.
///
/// Unknown email and wrong password produce the same error.
pub async fn admin_login(
    admin: &AdminCredential,
    passwords: &PasswordHasher,
    request: LoginRequest,
) -> Result<Session, AppError> {
    let email_matches = normalize_email(&request.email) == admin.email;
    let password_matches = passwords
        .verify(&request.password, &admin.password_hash)
        .await?;

    if !(email_matches && password_matches) {
        tracing::warn!("admin login rejected");
        return Err(AppError::InvalidCredentials("Invalid admin credentials"));
    }

    tracing::info!("admin logged in");
    Ok(Session::admin(admin.email.clone()))
}

/// Replace the caller's password after checking the current one.
///
/// A wrong current password leaves the stored hash untouched.
pub async fn change_password(
    store: &dyn Store,
    passwords: &PasswordHasher,
    identity: &UserIdentity,
    request: ChangePasswordRequest,
) -> Result<(), AppError> {
    let user = store
        .find_user_by_id(identity.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !passwords
        .verify(&request.current_password, &user.password_hash)
        .await?
    {
        return Err(AppError::InvalidCredentials("Current password is incorrect"));
    }
    check_password_strength(&request.new_password)?;

    let password_hash = passwords.hash(&request.new_password).await?;
    if !store.update_password_hash(user.id, &password_hash).await? {
        return Err(AppError::NotFound("User"));
    }

    tracing::info!(user_id = %user.id, "password changed");
    Ok(())
}
