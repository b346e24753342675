//! Authentication middleware
//!
//! Applied with `axum::middleware::from_fn_with_state` to every route that
//! needs a logged-in user. On success the request carries an
//! [`AuthContext`] extension; handlers take it with `Extension<AuthContext>`.
//! Any failure short-circuits with 401 before the handler runs.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tasknest_shared::auth::AuthContext;

use crate::{app::AppState, error::ApiError};

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let ctx: AuthContext = state.accounts.authenticate(authorization).await?;

    tracing::debug!(user_id = %ctx.user.id, "Request authenticated");
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
