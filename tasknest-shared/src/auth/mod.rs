//! Authentication primitives
//!
//! - [`password`]: Argon2id hashing and verification
//! - [`token`]: HS256 session token signing and verification
//! - [`gate`]: resolving an `Authorization` header to an authenticated user
//!
//! A session is valid only while its token string is present in the user's
//! token list. Signing proves who issued a token; the list decides whether
//! it still counts.

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{authenticate, AuthContext, AuthError};
pub use password::{hash_password, verify_password, HashingCost, PasswordError};
pub use token::{TokenError, TokenIssuer};
