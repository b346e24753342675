//! Avatar endpoints
//!
//! ```text
//! POST   /users/me/avatar   multipart field "avatar", .jpg/.jpeg/.png
//! DELETE /users/me/avatar
//! GET    /users/:id/avatar  public, image/png
//! ```

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use tasknest_shared::auth::AuthContext;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::parse_id,
};

/// Multipart field holding the image
const AVATAR_FIELD: &str = "avatar";

fn png(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::BadRequest("File too large".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Stores a new avatar and echoes the processed PNG
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        let stored = state
            .accounts
            .set_avatar(ctx.user.id, filename, bytes.to_vec(), state.config.api.avatar_max_bytes)
            .await?;

        return Ok(png(stored));
    }

    Err(ApiError::BadRequest("Please upload an image".to_string()))
}

pub async fn delete_avatar(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.accounts.remove_avatar(ctx.user.id).await?;
    Ok(StatusCode::OK)
}

/// Serves any user's avatar; 404 if the user or the avatar is missing
pub async fn get_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let user_id = parse_id(&id)?;

    match state.accounts.avatar(user_id).await? {
        Some(bytes) => Ok(png(bytes)),
        None => Err(ApiError::NotFound),
    }
}
