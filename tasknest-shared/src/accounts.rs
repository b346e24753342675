//! Account lifecycle
//!
//! [`AccountService`] owns every write to a user record. Each operation runs
//! its steps in a fixed order:
//!
//! - signup: normalize, validate, hash, insert, start session
//! - profile update: normalize, validate, hash the password if one was sent,
//!   write
//! - deletion: remove the user's tasks, then the user (one store call)
//!
//! Sessions are entries in the user's token list. Starting or ending one
//! reads the caller's snapshot of the list, edits it and writes the whole
//! list back.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{
    authenticate, hash_password, verify_password, AuthContext, AuthError, HashingCost,
    PasswordError, TokenError, TokenIssuer,
};
use crate::avatar::{process_avatar, AvatarError};
use crate::models::{CreateUser, FieldError, NewUser, UpdateUser, User, UserPatch};
use crate::store::{Store, StoreError};

/// Error type for account operations
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// One or more fields failed validation
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Email is already in use")]
    EmailTaken,

    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Unable to login")]
    InvalidCredentials,

    /// The user disappeared between authentication and the write
    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Avatar(#[from] AvatarError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(StoreError),

    /// A blocking worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AccountError::EmailTaken,
            other => AccountError::Store(other),
        }
    }
}

impl From<tokio::task::JoinError> for AccountError {
    fn from(err: tokio::task::JoinError) -> Self {
        AccountError::Join(err.to_string())
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

/// User account operations over a [`Store`]
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    issuer: TokenIssuer,
    cost: HashingCost,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, issuer: TokenIssuer, cost: HashingCost) -> Self {
        Self {
            store,
            issuer,
            cost,
        }
    }

    /// Creates an account and its first session
    pub async fn register(&self, new_user: NewUser) -> AccountResult<(User, String)> {
        let new_user = new_user.normalized();
        new_user.check().map_err(AccountError::Validation)?;

        let password_hash = self.hash(new_user.password).await?;

        let user = self
            .store
            .insert_user(CreateUser {
                name: new_user.name,
                email: new_user.email,
                password_hash,
                age: new_user.age,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        self.start_session(user).await
    }

    /// Checks credentials and starts a new session
    ///
    /// Unknown email and wrong password both yield
    /// [`AccountError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> AccountResult<(User, String)> {
        let email = crate::models::user::normalize_email(email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!("Login for unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;

        if !matches {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        self.start_session(user).await
    }

    /// Issues a token, appends it to `user`'s token list and persists the list
    ///
    /// The list written is `user.tokens` plus the new token. If another
    /// request changed the stored list since `user` was read, its change is
    /// overwritten.
    pub async fn start_session(&self, mut user: User) -> AccountResult<(User, String)> {
        let token = self.issuer.issue(user.id)?;
        user.tokens.push(token.clone());

        if !self.store.set_tokens(user.id, &user.tokens).await? {
            return Err(AccountError::NotFound);
        }

        debug!(user_id = %user.id, sessions = user.tokens.len(), "Session started");
        Ok((user, token))
    }

    /// Resolves a request's `Authorization` header
    pub async fn authenticate(&self, header: Option<&str>) -> Result<AuthContext, AuthError> {
        authenticate(self.store.as_ref(), &self.issuer, header).await
    }

    /// Ends the session the request was authenticated with
    pub async fn logout(&self, ctx: &AuthContext) -> AccountResult<()> {
        let remaining: Vec<String> = ctx
            .user
            .tokens
            .iter()
            .filter(|t| **t != ctx.token)
            .cloned()
            .collect();

        self.store.set_tokens(ctx.user.id, &remaining).await?;
        debug!(user_id = %ctx.user.id, "Session ended");
        Ok(())
    }

    /// Ends every session of the user
    pub async fn logout_all(&self, user: &User) -> AccountResult<()> {
        self.store.set_tokens(user.id, &[]).await?;
        debug!(user_id = %user.id, "All sessions ended");
        Ok(())
    }

    /// Applies a profile update
    ///
    /// A password in the patch is hashed before it is written; other fields
    /// are written as given after normalization.
    pub async fn update_profile(&self, user: &User, patch: UserPatch) -> AccountResult<User> {
        let patch = patch.normalized();
        patch.check().map_err(AccountError::Validation)?;

        let password_hash = match patch.password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };

        let changes = UpdateUser {
            name: patch.name,
            email: patch.email,
            password_hash,
            age: patch.age,
        };

        let updated = self
            .store
            .update_user(user.id, changes)
            .await?
            .ok_or(AccountError::NotFound)?;

        info!(user_id = %user.id, "Profile updated");
        Ok(updated)
    }

    /// Deletes the user and every task they own
    pub async fn delete_account(&self, user: &User) -> AccountResult<()> {
        if !self.store.delete_user(user.id).await? {
            return Err(AccountError::NotFound);
        }

        info!(user_id = %user.id, "Account deleted");
        Ok(())
    }

    /// Validates, resizes and stores an avatar; returns the stored PNG
    pub async fn set_avatar(
        &self,
        user_id: Uuid,
        filename: String,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> AccountResult<Vec<u8>> {
        let png =
            tokio::task::spawn_blocking(move || process_avatar(&filename, &bytes, max_bytes))
                .await??;

        if !self.store.set_avatar(user_id, Some(png.clone())).await? {
            return Err(AccountError::NotFound);
        }

        debug!(user_id = %user_id, bytes = png.len(), "Avatar stored");
        Ok(png)
    }

    pub async fn remove_avatar(&self, user_id: Uuid) -> AccountResult<()> {
        if !self.store.set_avatar(user_id, None).await? {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    /// Stored avatar PNG for any user, `None` if absent
    pub async fn avatar(&self, user_id: Uuid) -> AccountResult<Option<Vec<u8>>> {
        Ok(self.store.find_avatar(user_id).await?)
    }

    async fn hash(&self, password: String) -> AccountResult<String> {
        let cost = self.cost;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, &cost)).await??;
        Ok(hash)
    }
}
