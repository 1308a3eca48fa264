// src/auth.rs - Development-mode identity via the x-user-id header
use crate::models::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// The requesting user, taken from the `x-user-id` header. There is no token
/// verification here; the gateway in front of this service owns that.
pub struct AuthUser(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized)?;
        Ok(AuthUser(user_id.to_string()))
    }
}
