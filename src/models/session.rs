//! Request identity carried by a verified session token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Identity of a signed-in customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Identity of the administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub email: String,
    pub is_admin: bool,
}

/// Who made the request, inserted into request extensions by the auth
/// middleware. Handlers match on the variant instead of probing claims.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    User(UserIdentity),
    Admin(AdminIdentity),
}

impl Session {
    pub fn admin(email: impl Into<String>) -> Self {
        Session::Admin(AdminIdentity {
            email: email.into(),
            is_admin: true,
        })
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Session::Admin(_))
    }

    pub fn email(&self) -> &str {
        match self {
            Session::User(user) => &user.email,
            Session::Admin(admin) => &admin.email,
        }
    }

    /// The customer identity, or 403 for admin sessions on customer-only routes.
    pub fn user(&self) -> Result<&UserIdentity, AppError> {
        match self {
            Session::User(user) => Ok(user),
            Session::Admin(_) => Err(AppError::Forbidden("Customer accounts only.")),
        }
    }
}

/// Signed token payload.
///
/// User tokens carry `id`, `name` and `email`; admin tokens carry `email` and
/// `is_admin: true`. `jti` identifies the token for revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_admin: bool,
}

impl TokenClaims {
    pub fn new(session: &Session, iat: i64, exp: i64) -> Self {
        let (id, name, is_admin) = match session {
            Session::User(user) => (Some(user.id), Some(user.name.clone()), false),
            Session::Admin(_) => (None, None, true),
        };
        Self {
            jti: Uuid::new_v4(),
            iat,
            exp,
            email: session.email().to_string(),
            id,
            name,
            is_admin,
        }
    }
}

impl TryFrom<TokenClaims> for Session {
    type Error = AppError;

    /// Tokens that are neither a complete user shape nor an admin shape are invalid.
    fn try_from(claims: TokenClaims) -> Result<Self, Self::Error> {
        if claims.is_admin {
            return Ok(Session::admin(claims.email));
        }
        match (claims.id, claims.name) {
            (Some(id), Some(name)) => Ok(Session::User(UserIdentity {
                id,
                name,
                email: claims.email,
            })),
            _ => Err(AppError::InvalidToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_claims_round_trip_to_session() {
        let session = Session::User(UserIdentity {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
        });
        let claims = TokenClaims::new(&session, 0, 10);
        assert!(!claims.is_admin);
        assert_eq!(Session::try_from(claims).unwrap(), session);
    }

    #[test]
    fn admin_claims_skip_user_fields() {
        let claims = TokenClaims::new(&Session::admin("root@x.com"), 0, 10);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["is_admin"], true);
        assert!(json.get("id").is_none());
        assert!(Session::try_from(claims).unwrap().is_admin());
    }

    #[test]
    fn partial_user_claims_rejected() {
        let mut claims = TokenClaims::new(&Session::admin("a@x.com"), 0, 10);
        claims.is_admin = false;
        assert!(matches!(Session::try_from(claims), Err(AppError::InvalidToken)));
    }

    #[test]
    fn admin_session_cannot_act_as_customer() {
        assert!(matches!(
            Session::admin("root@x.com").user(),
            Err(AppError::Forbidden(_))
        ));
    }
}
