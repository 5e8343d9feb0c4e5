use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Half-open interval intersection: `[a_start, a_end)` and `[b_start, b_end)`
/// share at least one instant.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    Approved,
}

/// An appointment slot on the clinic calendar.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "start_at")]
    pub start: DateTime<Utc>,
    #[sqlx(rename = "end_at")]
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn status(&self) -> EventStatus {
        if self.is_approved {
            EventStatus::Approved
        } else {
            EventStatus::Pending
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        intervals_overlap(self.start, self.end, start, end)
    }

    /// Whether this event blocks `[start, end)` for everyone else.
    /// Only approved events hold a slot.
    pub fn blocks(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude_id: Option<Uuid>) -> bool {
        self.is_approved && exclude_id != Some(self.id) && self.overlaps(start, end)
    }
}

/// Insert payload. `approved_at` doubles as the approval flag.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub approved_at: Option<DateTime<Utc>>,
}

impl NewEvent {
    pub fn is_approved(&self) -> bool {
        self.approved_at.is_some()
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub name: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.start.is_none() && self.end.is_none() && self.description.is_none()
    }

    /// Returns the updated copy and whether its time interval moved.
    pub fn apply_to(&self, event: &Event) -> (Event, bool) {
        let mut updated = event.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(start) = self.start {
            updated.start = start;
        }
        if let Some(end) = self.end {
            updated.end = end;
        }
        if let Some(description) = &self.description {
            updated.description = Some(description.clone());
        }

        let moved = updated.start != event.start || updated.end != event.end;
        (updated, moved)
    }
}
