//! Request authentication
//!
//! Turns an `Authorization` header into an [`AuthContext`]. The steps run in
//! order and stop at the first failure:
//!
//! 1. Header present and of the form `Bearer <token>`
//! 2. Token signature verifies
//! 3. The user named by the token exists
//! 4. The token string is still in that user's token list
//!
//! The gate only reads from the store. Every rejection reason collapses into
//! the same 401 at the HTTP layer; the variants exist for logging and tests.

use tracing::debug;

use super::token::TokenIssuer;
use crate::models::User;
use crate::store::{Store, StoreError};

/// Authenticated caller, attached to the request by the auth layer
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User as read while authenticating
    pub user: User,

    /// The exact token presented, needed for logout
    pub token: String,
}

/// Error type for authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header")]
    MissingToken,

    #[error("Token signature is invalid")]
    InvalidToken,

    #[error("Token refers to an unknown user")]
    UnknownUser,

    #[error("Token has been revoked")]
    RevokedToken,

    /// Lookup failed; not an authentication failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// True for failures that mean "not authenticated" rather than a server fault
    pub fn is_rejection(&self) -> bool {
        !matches!(self, AuthError::Store(_))
    }
}

/// Extracts the token from an `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Authenticates a request from its `Authorization` header
pub async fn authenticate(
    store: &dyn Store,
    issuer: &TokenIssuer,
    header: Option<&str>,
) -> Result<AuthContext, AuthError> {
    let token = header.and_then(bearer_token).ok_or(AuthError::MissingToken)?;

    let user_id = issuer.validate(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::InvalidToken
    })?;

    let user = store
        .find_user(user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    if !user.has_token(token) {
        debug!(user_id = %user.id, "Token no longer active");
        return Err(AuthError::RevokedToken);
    }

    Ok(AuthContext {
        user,
        token: token.to_string(),
    })
}
