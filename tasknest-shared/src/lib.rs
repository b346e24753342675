//! # TaskNest Shared Library
//!
//! Domain logic for the TaskNest API: user accounts with token sessions and
//! per-owner tasks.
//!
//! ## Module Organization
//!
//! - `models`: users, tasks, payloads and validation
//! - `auth`: password hashing, session tokens, request authentication
//! - `store`: persistence trait with PostgreSQL and in-memory backends
//! - `accounts`: signup, login, sessions, profile and avatar operations
//! - `avatar`: upload checks and resizing
//! - `email`: welcome and cancellation notifications
//! - `db`: connection pool and migrations

pub mod accounts;
pub mod auth;
pub mod avatar;
pub mod db;
pub mod email;
pub mod models;
pub mod store;

/// Current version of the TaskNest shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
