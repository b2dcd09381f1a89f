//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use storefront_core::validation::validate_user_id;

use crate::error::ApiError;

/// Header carrying the caller's identity, set by the upstream identity
/// provider after authentication.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthenticated("missing X-User-Id header".to_string()))?;

        let user_id = value
            .to_str()
            .map_err(|_| ApiError::Unauthenticated("X-User-Id is not valid text".to_string()))?
            .trim();

        validate_user_id(user_id)
            .map_err(|e| ApiError::Unauthenticated(format!("invalid X-User-Id: {}", e)))?;

        Ok(UserId(user_id.to_string()))
    }
}
