//! Bearer token signing and verification
//!
//! Session tokens are HS256 JWTs carrying the user id. They have no
//! expiration: a token stays cryptographically valid forever, and a session
//! ends only when the token string is removed from the user's token list.
//!
//! # Claims
//!
//! - `sub`: user id
//! - `iat`: issued-at (Unix seconds)
//! - `jti`: random id, keeps two logins in the same second distinct
//!
//! # Example
//!
//! ```
//! use tasknest_shared::auth::token::TokenIssuer;
//! use uuid::Uuid;
//!
//! let issuer = TokenIssuer::new("test-secret-key-at-least-32-bytes-long");
//! let user_id = Uuid::new_v4();
//!
//! let token = issuer.issue(user_id).unwrap();
//! assert_eq!(issuer.validate(&token).unwrap(), user_id);
//! ```

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to sign token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Bad signature, malformed input or unexpected claims
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Token id
    pub jti: Uuid,
}

impl Claims {
    /// Creates claims for a new session of `user_id`
    pub fn new(user_id: Uuid) -> Self {
        Self {
            sub: user_id,
            iat: Utc::now().timestamp(),
            jti: Uuid::new_v4(),
        }
    }
}

/// Signs and verifies session tokens with the server secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer from the shared HMAC secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    /// Signs a fresh token for `user_id`
    ///
    /// This only produces the string. Recording it on the user is the
    /// caller's job (see `AccountService::start_session`).
    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), &Claims::new(user_id), &self.encoding)
            .map_err(|e| TokenError::CreateError(e.to_string()))
    }

    /// Verifies the signature and returns the embedded user id
    ///
    /// A valid signature does not mean the session is still active; the
    /// caller must also check the user's token list.
    pub fn validate(&self, token: &str) -> Result<Uuid, TokenError> {
        Ok(self.decode(token)?.sub)
    }

    /// Verifies the signature and returns all claims
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_issue_and_validate() {
        let issuer = TokenIssuer::new(SECRET);
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id).expect("Should create token");
        assert!(!token.is_empty());

        let claims = issuer.decode(&token).expect("Should validate token");
        assert_eq!(claims.sub, user_id);
        assert!(claims.iat <= Utc::now().timestamp());
    }

    #[test]
    fn test_tokens_are_unique_per_session() {
        let issuer = TokenIssuer::new(SECRET);
        let user_id = Uuid::new_v4();

        let first = issuer.issue(user_id).unwrap();
        let second = issuer.issue(user_id).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = TokenIssuer::new(SECRET).issue(Uuid::new_v4()).unwrap();

        let other = TokenIssuer::new("another-secret-key-at-least-32-bytes");
        assert!(matches!(other.validate(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_validate_malformed_input() {
        let issuer = TokenIssuer::new(SECRET);

        assert!(issuer.validate("").is_err());
        assert!(issuer.validate("not-a-token").is_err());
        assert!(issuer.validate("a.b.c").is_err());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let issuer = TokenIssuer::new(SECRET);
        let token = issuer.issue(Uuid::new_v4()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &Claims::new(Uuid::new_v4()),
            &EncodingKey::from_secret(b"attacker-secret-attacker-secret!!"),
        )
        .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;

        assert!(issuer.validate(&parts.join(".")).is_err());
    }

    #[test]
    fn test_token_without_expiry_stays_valid() {
        let issuer = TokenIssuer::new(SECRET);
        let user_id = Uuid::new_v4();

        let old = Claims {
            sub: user_id,
            iat: 0,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &old,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(issuer.validate(&token).unwrap(), user_id);
    }
}
