//! Request extractors
//!
//! Body problems are client errors here: malformed JSON, wrong content type
//! and type mismatches all become a 400 with `{"error": ...}` instead of
//! axum's default 415/422 plain-text rejections.

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tasknest_shared::models::FieldError;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// `Json<T>` that rejects with [`ApiError::BadRequest`]
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Deserializes an update body after checking every key is allowed
///
/// Any key outside `allowed` rejects the whole update with
/// `{"error": "Invalid updates!"}`; nothing is applied. Every updatable
/// field is required on the record, so an explicit `null` is a validation
/// error rather than "leave unchanged".
pub fn allow_listed<T: DeserializeOwned>(
    body: Map<String, Value>,
    allowed: &[&str],
) -> ApiResult<T> {
    if !body.keys().all(|key| allowed.contains(&key.as_str())) {
        return Err(ApiError::BadRequest("Invalid updates!".to_string()));
    }

    let nulls: Vec<FieldError> = body
        .iter()
        .filter(|(_, value)| value.is_null())
        .map(|(key, _)| FieldError::new(key.as_str(), format!("{} cannot be null", key)))
        .collect();
    if !nulls.is_empty() {
        return Err(ApiError::ValidationError(nulls));
    }

    serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Parses an id path segment; anything malformed is reported as not found
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}
