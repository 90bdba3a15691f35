//! Bearer-token authentication.
//!
//! Resolves `Authorization: Bearer <token>` into an
//! [`AuthScope`](crate::models::auth::AuthScope) once per request; handlers
//! take the scope as an extractor and services enforce access rules
//! against it.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::auth::AuthScope;
use crate::state::AppState;

impl FromRequestParts<AppState> for AuthScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_string()))?;
        let token = Uuid::parse_str(token.trim())
            .map_err(|_| AppError::Unauthorized("malformed bearer token".to_string()))?;

        let user = UserRepository::new(state.pool())
            .get_by_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown bearer token".to_string()))?;

        Ok(Self::new(user.id, user.role))
    }
}
