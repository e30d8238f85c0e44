//! Role-based authorization guards.
//!
//! Two roles exist: `user` (clients submitting extraction reports) and
//! `moderator` (reviewers who approve or reject them and manage the catalog).

use crate::core::error::AppError;
use crate::features::auth::model::{AuthenticatedUser, Role};
use axum::{extract::FromRequestParts, http::request::Parts};

fn authenticated(parts: &Parts) -> Result<&AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
}

/// Only allows callers holding the moderator role.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireModerator(user): RequireModerator) { ... }
/// ```
pub struct RequireModerator(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireModerator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if !user.is_moderator() {
            return Err(AppError::Forbidden("Moderator access required".to_string()));
        }

        Ok(RequireModerator(user.clone()))
    }
}

/// Only allows callers acting as clients (the `user` role).
pub struct RequireClient(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireClient
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticated(parts)?;

        if user.role != Role::User {
            return Err(AppError::Forbidden("Client access required".to_string()));
        }

        Ok(RequireClient(user.clone()))
    }
}
