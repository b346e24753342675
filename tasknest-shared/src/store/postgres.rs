//! PostgreSQL store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    CreateTask, CreateUser, SortField, SortOrder, Task, TaskPatch, TaskQuery, UpdateUser, User,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, age, tokens, created_at, updated_at";

const TASK_COLUMNS: &str = "id, description, completed, owner, created_at, updated_at";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let on_email = db_err
                .constraint()
                .map(|name| name.contains("email"))
                .unwrap_or(false);
            if db_err.is_unique_violation() && on_email {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// [`Store`] backed by a sqlx `PgPool`
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: CreateUser) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, age)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );

        let created = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.age)
            .fetch_one(&self.pool)
            .await?;

        debug!(user_id = %created.id, "Inserted user");
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<Option<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(name) = changes.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(email) = changes.email {
            builder.push(", email = ").push_bind(email);
        }
        if let Some(password_hash) = changes.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(age) = changes.age {
            builder.push(", age = ").push_bind(age);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        let user = builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn set_tokens(&self, id: Uuid, tokens: &[String]) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET tokens = $2 WHERE id = $1")
            .bind(id)
            .bind(tokens.to_vec())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET avatar = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_avatar(&self, id: Uuid) -> StoreResult<Option<Vec<u8>>> {
        let row: Option<(Option<Vec<u8>>,)> =
            sqlx::query_as("SELECT avatar FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(avatar,)| avatar))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let tasks = sqlx::query("DELETE FROM tasks WHERE owner = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            user_id = %id,
            tasks_removed = tasks.rows_affected(),
            "Deleted user"
        );
        Ok(users.rows_affected() > 0)
    }

    async fn insert_task(&self, owner: Uuid, task: CreateTask) -> StoreResult<Task> {
        let query = format!(
            "INSERT INTO tasks (id, description, completed, owner)
             VALUES ($1, $2, $3, $4)
             RETURNING {TASK_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Task>(&query)
            .bind(Uuid::new_v4())
            .bind(&task.description)
            .bind(task.completed)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner = $2");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn list_tasks(&self, owner: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        builder
            .push(TASK_COLUMNS)
            .push(" FROM tasks WHERE owner = ")
            .push_bind(owner);

        if let Some(completed) = query.completed {
            builder.push(" AND completed = ").push_bind(completed);
        }

        builder.push(order_by(query.sort));

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }
        if let Some(skip) = query.skip {
            builder.push(" OFFSET ").push_bind(skip);
        }

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;

        Ok(tasks)
    }

    async fn update_task(
        &self,
        id: Uuid,
        owner: Uuid,
        patch: TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE tasks SET updated_at = clock_timestamp()");

        if let Some(description) = patch.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(completed) = patch.completed {
            builder.push(", completed = ").push_bind(completed);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND owner = ")
            .push_bind(owner)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        let task = builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let query =
            format!("DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING {TASK_COLUMNS}");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn count_tasks(&self, owner: Uuid) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE owner = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// ORDER BY clause; ties fall back to creation order
///
/// Column names come from [`SortField::column`], never from the request.
fn order_by(sort: Option<(SortField, SortOrder)>) -> String {
    match sort {
        None => " ORDER BY created_at ASC, id ASC".to_string(),
        Some((SortField::CreatedAt, order)) => {
            format!(" ORDER BY created_at {0}, id {0}", order.as_sql())
        }
        Some((field, order)) => format!(
            " ORDER BY {} {}, created_at ASC, id ASC",
            field.column(),
            order.as_sql()
        ),
    }
}
