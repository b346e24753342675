//! Persistence for users and tasks
//!
//! [`Store`] is the only way the rest of the crate touches data. Two
//! implementations exist:
//!
//! - [`PgStore`]: PostgreSQL through sqlx, used in production
//! - [`MemoryStore`]: process-local maps behind a tokio `RwLock`, used by
//!   tests and for running the API without a database
//!
//! # Ownership
//!
//! Every task method takes the owner id as a required argument and matches
//! on `(id, owner)` in a single lookup. There is no way to fetch, change or
//! remove a task without naming its owner, and a task owned by someone else
//! is reported exactly like a missing one (`None`).
//!
//! # Token lists
//!
//! [`Store::set_tokens`] overwrites the whole list. Callers read the user,
//! change their copy and write it back, so two concurrent writers for the
//! same user race and the last write wins.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CreateTask, CreateUser, Task, TaskPatch, TaskQuery, UpdateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another user already has this email
    #[error("Email is already in use")]
    DuplicateEmail,

    /// Backend failure
    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User and task persistence
#[async_trait]
pub trait Store: Send + Sync {
    /// Checks the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Inserts a new user with an empty token list
    ///
    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn insert_user(&self, user: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up a user by normalized email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Writes the set fields of `changes` and bumps `updated_at`
    ///
    /// Returns `None` if the user does not exist.
    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<Option<User>>;

    /// Replaces the user's token list
    ///
    /// Returns false if the user does not exist.
    async fn set_tokens(&self, id: Uuid, tokens: &[String]) -> StoreResult<bool>;

    /// Stores or clears the avatar image
    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<bool>;

    /// Returns the avatar bytes, `None` if the user or the avatar is missing
    async fn find_avatar(&self, id: Uuid) -> StoreResult<Option<Vec<u8>>>;

    /// Removes every task owned by the user, then the user, atomically
    ///
    /// Returns false if the user does not exist.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    /// Inserts a task owned by `owner`
    async fn insert_task(&self, owner: Uuid, task: CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;

    /// Lists the owner's tasks with filter, sort and pagination applied
    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    /// Applies `patch` to the task if `owner` owns it
    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Option<Task>>;

    /// Deletes the task if `owner` owns it and returns what was removed
    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<i64>;
}
