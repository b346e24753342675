//! API route handlers
//!
//! - `health`: liveness and database status
//! - `users`: signup, login, sessions and profile
//! - `avatar`: avatar upload, removal and retrieval
//! - `tasks`: task CRUD scoped to the authenticated user

pub mod avatar;
pub mod health;
pub mod tasks;
pub mod users;
