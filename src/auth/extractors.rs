use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::jwt::JwtKeys,
    error::ApiError,
    state::AppState,
    users::{
        repo,
        repo_types::{Role, User},
    },
};

/// Authenticated caller. The token only proves identity; role and status
/// are loaded from the store on every request, so a role change or a
/// rejection takes effect on the caller's next request without any token
/// revocation.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthenticated("Invalid Authorization header"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthenticated("Invalid or expired token")
        })?;

        let user = repo::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::Unauthenticated("Account no longer exists"))?;

        Ok(CurrentUser(user))
    }
}

/// Caller holding the reviewer role. Exact match, admins do not pass.
pub struct ReviewerUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for ReviewerUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Reviewer {
            return Err(ApiError::Forbidden);
        }
        Ok(ReviewerUser(user))
    }
}

/// Caller holding the admin role.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
