//! Data models
//!
//! - [`user`]: user accounts, public view, signup/update payloads
//! - [`task`]: tasks, create/update payloads, list queries

use serde::{Deserialize, Serialize};

pub mod task;
pub mod user;

pub use task::{CreateTask, SortField, SortOrder, Task, TaskPatch, TaskQuery, TaskQueryParams};
pub use user::{CreateUser, NewUser, PublicUser, UpdateUser, User, UserPatch};

/// A single field validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flattens `validator` errors into field/message pairs, ordered by field
    pub fn from_validation(errors: &validator::ValidationErrors) -> Vec<Self> {
        let mut flattened: Vec<Self> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        flattened.sort_by(|a, b| a.field.cmp(&b.field));
        flattened
    }
}
