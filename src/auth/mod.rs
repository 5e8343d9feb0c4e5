//! Request identity.
//!
//! Authentication happens upstream: the gateway verifies the session and
//! forwards the user's id in `X-User-Id`. This module only resolves that id
//! into a `User` so handlers receive the acting user as an explicit argument.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;
use uuid::Uuid;

use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user performing the request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl Actor {
    pub fn user(&self) -> &User {
        &self.0
    }
}

fn user_id_from_parts(parts: &Parts) -> Result<Uuid, AppError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::AuthError("Missing user identity".to_string()))?;

    raw.to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::AuthError("Malformed user identity".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from_parts(parts)?;

        let user = state
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Unknown user".to_string()))?;

        debug!(user_id = %user.id, is_staff = user.is_staff, "Resolved actor");
        Ok(Actor(user))
    }
}
