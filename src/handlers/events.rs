use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Actor;
use crate::models::EventChanges;
use crate::services::{project, CreateAppointment, PublicEvent, VisibilityPolicy};
use crate::state::AppState;
use crate::utils::datetime::parse_timestamp;
use crate::utils::error::AppError;
use crate::utils::response::{json, status};
use crate::utils::AppJson;

#[derive(Debug, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub auto_approve: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub name: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
struct UpdatedBody {
    status: &'static str,
    #[serde(flatten)]
    event: PublicEvent,
}

#[derive(Serialize)]
struct ApprovedBody {
    status: &'static str,
    id: Uuid,
}

/// `title` wins over `name`; blank values count as absent.
fn pick_title(title: Option<String>, name: Option<String>) -> Option<String> {
    let present = |value: &String| !value.trim().is_empty();
    title.filter(present).or_else(|| name.filter(present))
}

/// Matches the `events.name` column width.
const MAX_TITLE_CHARS: usize = 255;

fn check_title(name: String) -> Result<String, AppError> {
    if name.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::ValidationError(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(name)
}

fn parse_field(raw: &str, tz: Tz, message: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(raw, tz).ok_or_else(|| AppError::ValidationError(message.to_string()))
}

impl CreateEventRequest {
    fn into_appointment(self, tz: Tz) -> Result<CreateAppointment, AppError> {
        let (name, start, end) = match (pick_title(self.title, self.name), self.start, self.end) {
            (Some(name), Some(start), Some(end)) => (name, start, end),
            _ => return Err(AppError::ValidationError("Missing required fields".to_string())),
        };

        let invalid = "Invalid date format, expected ISO 8601";
        Ok(CreateAppointment {
            name: check_title(name)?,
            start: parse_field(&start, tz, invalid)?,
            end: parse_field(&end, tz, invalid)?,
            description: self.description,
            on_behalf_of: self.user_id,
            auto_approve: self.auto_approve,
        })
    }
}

impl UpdateEventRequest {
    fn into_changes(self, tz: Tz) -> Result<EventChanges, AppError> {
        Ok(EventChanges {
            name: pick_title(self.title, self.name).map(check_title).transpose()?,
            start: self
                .start
                .map(|raw| parse_field(&raw, tz, "Invalid start date format"))
                .transpose()?,
            end: self
                .end
                .map(|raw| parse_field(&raw, tz, "Invalid end date format"))
                .transpose()?,
            description: self.description,
        })
    }
}

pub async fn list_events(State(state): State<AppState>, actor: Actor) -> Result<Response, AppError> {
    let viewer = actor.user();
    let events = state.appointments.list_for(viewer).await?;

    let payload: Vec<PublicEvent> = events
        .iter()
        .map(|event| project(event, viewer, state.visibility, state.timezone))
        .collect();

    Ok(json(StatusCode::OK, payload))
}

pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(body): AppJson<CreateEventRequest>,
) -> Result<Response, AppError> {
    let request = body.into_appointment(state.timezone)?;
    let event = state.appointments.create(actor.user(), request).await?;

    let payload = project(&event, actor.user(), VisibilityPolicy::Full, state.timezone);
    Ok(json(StatusCode::CREATED, payload))
}

pub async fn update_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<UpdateEventRequest>,
) -> Result<Response, AppError> {
    let changes = body.into_changes(state.timezone)?;
    let event = state.appointments.update(actor.user(), id, changes).await?;

    let body = UpdatedBody {
        status: "updated",
        event: project(&event, actor.user(), VisibilityPolicy::Full, state.timezone),
    };
    Ok(json(StatusCode::OK, body))
}

pub async fn delete_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.appointments.delete(actor.user(), id).await?;
    Ok(status("deleted"))
}

pub async fn approve_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state.appointments.approve(actor.user(), id).await?;
    Ok(json(
        StatusCode::OK,
        ApprovedBody {
            status: "approved",
            id: event.id,
        },
    ))
}
