//! User account endpoints
//!
//! # Endpoints
//!
//! ```text
//! POST   /users             signup, 201 {user, token}
//! POST   /users/login       200 {user, token}
//! POST   /users/logout      ends the current session
//! POST   /users/logoutAll   ends every session
//! GET    /users/me          profile
//! PATCH  /users/me          name, email, password, age
//! DELETE /users/me          deletes the account and its tasks
//! ```
//!
//! User bodies are always the public view: no password hash, tokens or
//! avatar.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tasknest_shared::{
    auth::AuthContext,
    models::{user::UPDATABLE_FIELDS, NewUser, PublicUser, UserPatch},
};

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{allow_listed, JsonBody},
};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Signup and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: PublicUser,
    pub token: String,
}

/// Creates an account, sends the welcome email and starts a session
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(new_user): JsonBody<NewUser>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let (user, token) = state.accounts.register(new_user).await?;

    state.notifier.send_welcome(&user.email, &user.name).await;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: user.to_public(),
            token,
        }),
    ))
}

/// Exchanges credentials for a new session token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let (user, token) = state.accounts.login(&req.email, &req.password).await?;

    Ok(Json(SessionResponse {
        user: user.to_public(),
        token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.accounts.logout(&ctx).await?;
    Ok(StatusCode::OK)
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.accounts.logout_all(&ctx.user).await?;
    Ok(StatusCode::OK)
}

pub async fn me(Extension(ctx): Extension<AuthContext>) -> Json<PublicUser> {
    Json(ctx.user.to_public())
}

/// Updates the caller's profile
///
/// Rejected as a whole with `{"error": "Invalid updates!"}` if the body has
/// any key outside the allow-list.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> ApiResult<Json<PublicUser>> {
    let patch: UserPatch = allow_listed(body, &UPDATABLE_FIELDS)?;
    let user = state.accounts.update_profile(&ctx.user, patch).await?;
    Ok(Json(user.to_public()))
}

/// Deletes the caller, their tasks and their sessions
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<PublicUser>> {
    state.accounts.delete_account(&ctx.user).await?;

    state
        .notifier
        .send_cancelation(&ctx.user.email, &ctx.user.name)
        .await;

    Ok(Json(ctx.user.to_public()))
}
