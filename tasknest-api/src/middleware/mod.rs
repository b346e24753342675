//! Middleware for the API server
//!
//! - `auth`: resolves the bearer token and attaches the caller
//! - `security`: security response headers

pub mod auth;
pub mod security;
