use thrive_core::model::UserRole;
use uuid::Uuid;

use crate::error::AuthError;
use crate::jwt::AccessTokenClaims;

/// The authenticated caller, inserted into request extensions by
/// [`authentication_middleware`](super::authentication_middleware).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub token_id: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl TryFrom<AccessTokenClaims> for AuthContext {
    type Error = AuthError;

    fn try_from(claims: AccessTokenClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            email: claims.email,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}
