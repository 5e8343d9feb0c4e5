use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::Actor;
use crate::models::{ClientSummary, UserProfile};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::json;

/// Staff-only list of clients.
pub async fn list_users(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    if !actor.user().is_staff {
        return Err(AppError::Forbidden("Staff access required".to_string()));
    }

    let clients: Vec<ClientSummary> = state
        .store
        .list_clients()
        .await?
        .iter()
        .map(ClientSummary::from)
        .collect();

    Ok(json(StatusCode::OK, clients))
}

pub async fn current_user(actor: Actor) -> Response {
    json(StatusCode::OK, UserProfile::from(actor.user()))
}

/// Staff may read any profile; clients only their own.
pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let viewer = actor.user();
    if viewer.id == id {
        return Ok(json(StatusCode::OK, UserProfile::from(viewer)));
    }
    if !viewer.is_staff {
        return Err(AppError::Forbidden(
            "Clients can only view their own profile".to_string(),
        ));
    }

    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id '{}' was not found", id)))?;

    Ok(json(StatusCode::OK, UserProfile::from(&user)))
}
