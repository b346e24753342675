//! User model and input validation
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name TEXT NOT NULL,
//!     email TEXT NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     age INTEGER NOT NULL DEFAULT 0,
//!     avatar BYTEA,
//!     tokens TEXT[] NOT NULL DEFAULT '{}',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! The avatar column is never loaded with the user row; it is read on its own
//! through `Store::find_avatar`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

use super::FieldError;

/// Fields a client may change through a profile update
pub const UPDATABLE_FIELDS: [&str; 4] = ["name", "email", "password", "age"];

/// User account as stored
///
/// Holds the password hash and the active session tokens, so it must never
/// be serialized to clients. Use [`PublicUser`] for responses.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Lowercased email, unique across users
    pub email: String,

    /// Argon2id PHC hash
    pub password_hash: String,

    /// Age in years
    pub age: i32,

    /// Active session tokens, oldest first
    pub tokens: Vec<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns true if `token` is one of this user's active sessions
    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Client-facing view of this user
    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// Client-facing user representation
///
/// Carries no password, token or avatar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Signup payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[serde(default)]
    #[validate(length(min = 1, message = "Please provide a name"))]
    pub name: String,

    #[serde(default)]
    #[validate(custom(function = "email_address"))]
    pub email: String,

    #[serde(default)]
    #[validate(
        length(min = 7, message = "Password must be at least 7 characters long"),
        custom(function = "password_rules")
    )]
    pub password: String,

    #[serde(default)]
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: i32,
}

impl NewUser {
    /// Trims all strings and lowercases the email
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password.trim().to_string(),
            age: self.age,
        }
    }

    /// Checks every field and reports all failures at once
    ///
    /// Expects a [`normalized`](Self::normalized) value.
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|e| FieldError::from_validation(&e))
    }
}

/// Profile update payload
///
/// Only fields present in the request are set, and only those are validated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    #[validate(length(min = 1, message = "Please provide a name"))]
    pub name: Option<String>,

    #[validate(custom(function = "email_address"))]
    pub email: Option<String>,

    #[validate(
        length(min = 7, message = "Password must be at least 7 characters long"),
        custom(function = "password_rules")
    )]
    pub password: Option<String>,

    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UserPatch {
    /// Trims strings and lowercases the email
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            email: self.email.as_deref().map(normalize_email),
            password: self.password.map(|p| p.trim().to_string()),
            age: self.age,
        }
    }

    /// Validates the fields that are present
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|e| FieldError::from_validation(&e))
    }

    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted form of a new user, password already hashed
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
}

/// Column changes for an existing user
///
/// Only non-None fields are written. `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i32>,
}

/// Trims and lowercases an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Email format rule
///
/// On top of the `validator` check, the domain must contain a dot and end in
/// a label of at least two characters, so `victor@live` is rejected.
pub fn email_address(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::new("required").with_message("Please provide an email".into()));
    }

    let has_tld = email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
        .map(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        .unwrap_or(false);

    if email.validate_email() && has_tld {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Please provide a correct email".into()))
    }
}

/// Password content rule; length is checked by the `length` validator
pub fn password_rules(password: &str) -> Result<(), ValidationError> {
    if password.to_lowercase().contains("password") {
        return Err(ValidationError::new("password")
            .with_message("Password cannot contain the word 'password'".into()));
    }
    Ok(())
}
