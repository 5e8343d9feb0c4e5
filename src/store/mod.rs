//! Persistence boundary for appointments, users and availability.
//!
//! Every write that can create an approved interval is atomic with its
//! overlap check: implementations must never let two approved events
//! overlap, even under concurrent requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Availability, Event, NewEvent, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("time slot overlaps an approved appointment")]
    Conflict,

    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an approval write.
#[derive(Debug, Clone)]
pub enum Approval {
    /// This call moved the event from pending to approved.
    Granted(Event),
    /// The event was already approved; nothing was written.
    Unchanged(Event),
}

impl Approval {
    pub fn event(&self) -> &Event {
        match self {
            Approval::Granted(event) | Approval::Unchanged(event) => event,
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            Approval::Granted(event) | Approval::Unchanged(event) => event,
        }
    }
}

/// Which events a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    All,
    /// Approved events plus everything created by the given user.
    VisibleTo(Uuid),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Events in the scope, ordered by start.
    async fn list_events(&self, scope: EventScope) -> StoreResult<Vec<Event>>;

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// True iff an approved event other than `exclude_id` intersects
    /// `[start, end)`.
    async fn is_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<bool>;

    /// Inserts the event. With `check_overlap` the write fails with
    /// `Conflict` when the slot is taken. Approved inserts always check.
    async fn insert_event(&self, new: NewEvent, check_overlap: bool) -> StoreResult<Event>;

    /// Writes the name, interval and description of `event` onto the stored
    /// row. Approval state is read from storage, never from `event`, and a
    /// row that is approved at write time is always overlap-checked.
    async fn save_event(&self, event: &Event, check_overlap: bool) -> StoreResult<Event>;

    /// Marks the event approved at `approved_at` after re-checking its slot.
    /// Concurrent calls on one event yield exactly one `Approval::Granted`.
    async fn approve_event(&self, id: Uuid, approved_at: DateTime<Utc>) -> StoreResult<Approval>;

    async fn delete_event(&self, id: Uuid) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Non-staff users ordered by username.
    async fn list_clients(&self) -> StoreResult<Vec<User>>;

    /// Windows ordered by weekday, then start time.
    async fn list_availability(&self) -> StoreResult<Vec<Availability>>;
}
