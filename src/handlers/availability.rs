use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::auth::Actor;
use crate::models::AvailabilityWindow;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::json;

pub async fn list_availability(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Response, AppError> {
    let windows: Vec<AvailabilityWindow> = state
        .store
        .list_availability()
        .await?
        .iter()
        .map(AvailabilityWindow::from)
        .collect();

    Ok(json(StatusCode::OK, windows))
}
