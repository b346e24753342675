//! Task model, payloads and list queries
//!
//! Every task has exactly one owner, fixed at creation. Store operations take
//! the owner id as a required argument and filter on it in the same query as
//! the task id, so a foreign task looks exactly like a missing one.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     description TEXT NOT NULL,
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     owner UUID NOT NULL REFERENCES users(id),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::FieldError;

/// Fields a client may change through a task update
pub const UPDATABLE_FIELDS: [&str; 2] = ["description", "completed"];

/// Task owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// What needs doing
    pub description: String,

    /// Whether the task is done
    pub completed: bool,

    /// Owning user
    pub owner: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Task creation payload
///
/// Any `owner` sent by the client is ignored; the owner always comes from
/// the authenticated session.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTask {
    #[serde(default)]
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default)]
    pub completed: bool,
}

impl CreateTask {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            completed: self.completed,
        }
    }

    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|e| FieldError::from_validation(&e))
    }
}

/// Task update payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: Option<String>,

    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.map(|d| d.trim().to_string()),
            completed: self.completed,
        }
    }

    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|e| FieldError::from_validation(&e))
    }
}

/// Sortable task columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Column name in the `tasks` table
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Description => "description",
            SortField::Completed => "completed",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    /// Ascending comparison of two tasks on this field
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortField::Description => a.description.cmp(&b.description),
            SortField::Completed => a.completed.cmp(&b.completed),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

impl FromStr for SortField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(SortField::Description),
            "completed" => Ok(SortField::Completed),
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(FieldError::new(
                "sortBy",
                format!("Cannot sort by '{}'", other),
            )),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Applies this direction to an ascending ordering
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Raw list query string, e.g. `?completed=true&sortBy=createdAt:desc&limit=10&skip=20`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQueryParams {
    pub completed: Option<String>,

    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,

    pub limit: Option<String>,

    pub skip: Option<String>,
}

/// Parsed filter, sort and pagination for listing a user's tasks
///
/// Ownership is not part of the query; stores always add it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub completed: Option<bool>,
    pub sort: Option<(SortField, SortOrder)>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl TryFrom<TaskQueryParams> for TaskQuery {
    type Error = FieldError;

    fn try_from(params: TaskQueryParams) -> Result<Self, Self::Error> {
        let completed = params.completed.map(|value| value == "true");

        let sort = match params.sort_by.as_deref() {
            None | Some("") => None,
            Some(raw) => {
                let (field, order) = raw.split_once(':').unwrap_or((raw, "asc"));
                let order = if order == "desc" {
                    SortOrder::Desc
                } else {
                    SortOrder::Asc
                };
                Some((field.parse::<SortField>()?, order))
            }
        };

        Ok(Self {
            completed,
            sort,
            // a zero limit means no limit
            limit: parse_count(params.limit.as_deref()).filter(|limit| *limit > 0),
            skip: parse_count(params.skip.as_deref()),
        })
    }
}

/// Non-negative integer or nothing; junk is ignored
fn parse_count(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|value| *value >= 0)
}
