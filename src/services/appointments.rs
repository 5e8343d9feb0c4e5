//! Appointment workflow.
//!
//! ```text
//! create(staff)  ──────────────► approved
//! create(client) ──► pending ──► approved   (approve, staff only)
//! any state ──────────────────► deleted     (staff or owner)
//! ```
//!
//! Every operation takes the acting user explicitly. Overlap checks are
//! delegated to the store so check and write stay atomic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Event, EventChanges, NewEvent, User};
use crate::services::notifier::Notifier;
use crate::services::visibility::is_visible;
use crate::store::{Approval, EventScope, Store, StoreError};
use crate::utils::error::AppError;

/// A validated booking request.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    /// Staff only: book for another user.
    pub on_behalf_of: Option<Uuid>,
    /// Staff only: `Some(false)` files the booking as pending.
    pub auto_approve: Option<bool>,
}

fn ensure_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::ValidationError(
            "Start must be before end".to_string(),
        ));
    }
    Ok(())
}

fn event_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Event with id '{}' was not found", id))
}

fn map_store_error(id: Uuid) -> impl FnOnce(StoreError) -> AppError {
    move |err| match err {
        StoreError::NotFound => event_not_found(id),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Events `viewer` may see, ordered by start.
    pub async fn list_for(&self, viewer: &User) -> Result<Vec<Event>, AppError> {
        let scope = if viewer.is_staff {
            EventScope::All
        } else {
            EventScope::VisibleTo(viewer.id)
        };

        let events = self.store.list_events(scope).await?;
        Ok(events
            .into_iter()
            .filter(|event| is_visible(event, viewer))
            .collect())
    }

    pub async fn is_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        Ok(self.store.is_overlapping(start, end, exclude_id).await?)
    }

    pub async fn create(&self, actor: &User, request: CreateAppointment) -> Result<Event, AppError> {
        ensure_interval(request.start, request.end)?;

        let owner = match request.on_behalf_of {
            Some(user_id) if user_id != actor.id => {
                if !actor.is_staff {
                    return Err(AppError::Forbidden(
                        "Only staff can book on behalf of another user".to_string(),
                    ));
                }
                self.store
                    .find_user(user_id)
                    .await?
                    .ok_or_else(|| AppError::ValidationError(format!("Unknown user '{}'", user_id)))?
                    .id
            }
            _ => actor.id,
        };

        let approve = actor.is_staff && request.auto_approve.unwrap_or(true);
        let new = NewEvent {
            name: request.name,
            start: request.start,
            end: request.end,
            description: request.description,
            created_by: owner,
            approved_at: approve.then(Utc::now),
        };

        let event = self.store.insert_event(new, true).await?;
        info!(
            event_id = %event.id,
            actor_id = %actor.id,
            owner_id = %owner,
            status = ?event.status(),
            "Appointment created"
        );
        Ok(event)
    }

    pub async fn update(&self, actor: &User, id: Uuid, changes: EventChanges) -> Result<Event, AppError> {
        let current = self
            .store
            .find_event(id)
            .await?
            .ok_or_else(|| event_not_found(id))?;

        if !actor.is_staff && !current.is_owned_by(actor.id) {
            return Err(AppError::Forbidden(
                "Only staff or the owner can modify this event".to_string(),
            ));
        }

        if changes.is_empty() {
            return Ok(current);
        }

        let (updated, moved) = changes.apply_to(&current);
        ensure_interval(updated.start, updated.end)?;

        let saved = self
            .store
            .save_event(&updated, moved)
            .await
            .map_err(map_store_error(id))?;
        debug!(event_id = %id, actor_id = %actor.id, moved, "Appointment updated");
        Ok(saved)
    }

    pub async fn delete(&self, actor: &User, id: Uuid) -> Result<(), AppError> {
        let event = self
            .store
            .find_event(id)
            .await?
            .ok_or_else(|| event_not_found(id))?;

        if !actor.is_staff && !event.is_owned_by(actor.id) {
            return Err(AppError::Forbidden(
                "Only staff or the owner can delete this event".to_string(),
            ));
        }

        self.store.delete_event(id).await.map_err(map_store_error(id))?;
        info!(event_id = %id, actor_id = %actor.id, "Appointment deleted");
        Ok(())
    }

    /// Approves a pending request. The owner is notified in the background;
    /// approving an already approved event changes nothing.
    pub async fn approve(&self, actor: &User, id: Uuid) -> Result<Event, AppError> {
        if !actor.is_staff {
            return Err(AppError::Forbidden(
                "Only staff can approve appointments".to_string(),
            ));
        }

        let approval = self
            .store
            .approve_event(id, Utc::now())
            .await
            .map_err(map_store_error(id))?;

        match approval {
            Approval::Granted(event) => {
                info!(event_id = %id, actor_id = %actor.id, "Appointment approved");
                self.notify_approved(&event);
                Ok(event)
            }
            Approval::Unchanged(event) => {
                debug!(event_id = %id, actor_id = %actor.id, "Appointment already approved");
                Ok(event)
            }
        }
    }

    fn notify_approved(&self, event: &Event) {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let event = event.clone();

        tokio::spawn(async move {
            let owner = match store.find_user(event.created_by).await {
                Ok(Some(owner)) => owner,
                Ok(None) => {
                    warn!(event_id = %event.id, "Approval notification skipped: owner not found");
                    return;
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "Approval notification skipped");
                    return;
                }
            };

            if owner.email.trim().is_empty() {
                debug!(event_id = %event.id, user_id = %owner.id, "Owner has no email address");
                return;
            }

            if let Err(e) = notifier.appointment_approved(&owner, &event).await {
                warn!(event_id = %event.id, error = %e, "Approval notification failed");
            }
        });
    }
}
