//! HS256 access tokens.
//!
//! ```ignore
//! let jwt = JwtService::new(secret, "thrive", 3600);
//! let issued = jwt.issue(&user)?;
//! let claims = jwt.verify(&issued.token)?;
//! assert_eq!(claims.sub, user.id.to_string());
//! ```

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thrive_core::model::{User, UserRole};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AuthError;

/// Clock skew tolerated when checking `exp`.
const LEEWAY_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::invalid_token("subject is not a user id"))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl_secs: u64,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.issuer)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl_secs,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.encode(&claims)?;
        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: self.ttl_secs,
        })
    }

    pub fn encode(&self, claims: &AccessTokenClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("Failed to sign token: {e}")))
    }

    /// Checks signature, issuer and expiry.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.leeway = LEEWAY_SECS;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::invalid_token(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes!";

    fn user() -> User {
        User::new("ada@example.com", "Ada")
    }

    #[test]
    fn issue_and_verify() {
        let jwt = JwtService::new(SECRET, "thrive", 3600);
        let user = user();
        let issued = jwt.issue(&user).unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3600);

        let claims = jwt.verify(&issued.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn tokens_have_unique_ids() {
        let jwt = JwtService::new(SECRET, "thrive", 60);
        let user = user();
        let a = jwt.verify(&jwt.issue(&user).unwrap().token).unwrap();
        let b = jwt.verify(&jwt.issue(&user).unwrap().token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtService::new(SECRET, "thrive", 60);
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims {
            sub: Uuid::new_v4().to_string(),
            email: "old@example.com".into(),
            role: UserRole::User,
            iss: "thrive".into(),
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = jwt.encode(&claims).unwrap();
        assert!(matches!(jwt.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn wrong_secret_or_issuer_is_rejected() {
        let jwt = JwtService::new(SECRET, "thrive", 60);
        let token = jwt.issue(&user()).unwrap().token;

        let other_secret = JwtService::new("another-secret-that-is-32-bytes-long", "thrive", 60);
        assert!(matches!(
            other_secret.verify(&token),
            Err(AuthError::InvalidToken { .. })
        ));

        let other_issuer = JwtService::new(SECRET, "someone-else", 60);
        assert!(other_issuer.verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let jwt = JwtService::new(SECRET, "thrive", 60);
        assert!(jwt.verify("not.a.jwt").is_err());
    }
}
