//! Task endpoints
//!
//! Every handler runs behind the auth layer and passes the caller's id to
//! the store alongside the task id. Tasks owned by someone else, missing
//! tasks and malformed ids all answer 404 with an empty body.
//!
//! # List query
//!
//! ```text
//! GET /tasks?completed=true&sortBy=createdAt:desc&limit=10&skip=20
//! ```

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{Map, Value};
use tasknest_shared::{
    auth::AuthContext,
    models::{task::UPDATABLE_FIELDS, CreateTask, Task, TaskPatch, TaskQuery, TaskQueryParams},
};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{allow_listed, parse_id, JsonBody},
};

/// Creates a task owned by the caller; any `owner` in the body is ignored
pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    JsonBody(create): JsonBody<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let create = create.normalized();
    create.check().map_err(ApiError::ValidationError)?;

    let task = state.store.insert_task(ctx.user.id, create).await?;

    tracing::debug!(task_id = %task.id, owner = %task.owner, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(params): Query<TaskQueryParams>,
) -> ApiResult<Json<Vec<Task>>> {
    let query = TaskQuery::try_from(params).map_err(|e| ApiError::ValidationError(vec![e]))?;
    let tasks = state.store.list_tasks(ctx.user.id, &query).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id)?;

    state
        .store
        .find_task(id, ctx.user.id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Updates `description` and/or `completed`; other keys reject the request
pub async fn update_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> ApiResult<Json<Task>> {
    let patch: TaskPatch = allow_listed(body, &UPDATABLE_FIELDS)?;
    let patch = patch.normalized();
    patch.check().map_err(ApiError::ValidationError)?;

    let id = parse_id(&id)?;

    state
        .store
        .update_task(id, ctx.user.id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Deletes the task and returns it
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_id(&id)?;

    state
        .store
        .delete_task(id, ctx.user.id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
