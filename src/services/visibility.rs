use std::fmt;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Event, User};
use crate::utils::datetime::format_timestamp;

pub const REDACTED_TITLE: &str = "Booked";
pub const APPROVED_COLOR: &str = "#198754";
pub const PENDING_COLOR: &str = "#ffc107";

/// How a client sees other people's approved appointments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityPolicy {
    /// Shown as stored.
    Full,
    /// Title replaced with a placeholder, description and metadata removed.
    #[default]
    Redacted,
}

impl FromStr for VisibilityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "redacted" => Ok(Self::Redacted),
            other => Err(format!("unknown visibility policy '{}'", other)),
        }
    }
}

impl fmt::Display for VisibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Redacted => f.write_str("redacted"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProps {
    pub created_by: Uuid,
    pub approved_at: Option<String>,
    pub is_owner: bool,
}

/// Calendar-facing view of an event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicEvent {
    pub id: Uuid,
    pub title: String,
    pub start: String,
    pub end: String,
    pub description: String,
    pub is_approved: bool,
    pub background_color: &'static str,
    pub border_color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_props: Option<ExtendedProps>,
}

/// Whether `viewer` may see `event` at all.
pub fn is_visible(event: &Event, viewer: &User) -> bool {
    viewer.is_staff || event.is_approved || event.is_owned_by(viewer.id)
}

/// Projects `event` for `viewer`. Staff and owners always get every field;
/// everyone else gets what `policy` allows.
pub fn project(event: &Event, viewer: &User, policy: VisibilityPolicy, tz: Tz) -> PublicEvent {
    let is_owner = event.is_owned_by(viewer.id);
    let redact = !viewer.is_staff && !is_owner && policy == VisibilityPolicy::Redacted;
    let color = if event.is_approved {
        APPROVED_COLOR
    } else {
        PENDING_COLOR
    };

    let (title, description, extended_props) = if redact {
        (REDACTED_TITLE.to_string(), String::new(), None)
    } else {
        (
            event.name.clone(),
            event.description.clone().unwrap_or_default(),
            Some(ExtendedProps {
                created_by: event.created_by,
                approved_at: event.approved_at.map(|ts| format_timestamp(ts, tz)),
                is_owner,
            }),
        )
    };

    PublicEvent {
        id: event.id,
        title,
        start: format_timestamp(event.start, tz),
        end: format_timestamp(event.end, tz),
        description,
        is_approved: event.is_approved,
        background_color: color,
        border_color: color,
        extended_props,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, hour, 0, 0).unwrap()
    }

    fn user(is_staff: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: if is_staff { "doctor" } else { "client" }.to_string(),
            full_name: String::new(),
            email: String::new(),
            is_staff,
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    fn event(owner: &User, approved: bool) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: "Therapy – J. Doe".to_string(),
            start: ts(9),
            end: ts(10),
            description: Some("Second session".to_string()),
            created_by: owner.id,
            is_approved: approved,
            approved_at: approved.then(|| ts(8)),
            created_at: ts(7),
            updated_at: ts(7),
        }
    }

    #[test]
    fn test_owner_sees_pending_event_in_full() {
        let client = user(false);
        let pending = event(&client, false);

        let view = project(&pending, &client, VisibilityPolicy::Redacted, Tz::UTC);
        assert_eq!(view.title, "Therapy – J. Doe");
        assert_eq!(view.description, "Second session");
        assert_eq!(view.background_color, PENDING_COLOR);
        assert_eq!(view.border_color, PENDING_COLOR);
        assert!(view.extended_props.unwrap().is_owner);
    }

    #[test]
    fn test_redacted_policy_masks_foreign_events() {
        let owner = user(false);
        let other = user(false);
        let booked = event(&owner, true);

        let view = project(&booked, &other, VisibilityPolicy::Redacted, Tz::UTC);
        assert_eq!(view.title, REDACTED_TITLE);
        assert_eq!(view.description, "");
        assert!(view.extended_props.is_none());
        assert_eq!(view.start, "2026-10-16T09:00:00+00:00");
        assert_eq!(view.background_color, APPROVED_COLOR);
    }

    #[test]
    fn test_full_policy_shows_foreign_events() {
        let owner = user(false);
        let other = user(false);
        let booked = event(&owner, true);

        let view = project(&booked, &other, VisibilityPolicy::Full, Tz::UTC);
        assert_eq!(view.title, "Therapy – J. Doe");
        assert_eq!(view.description, "Second session");
        let props = view.extended_props.unwrap();
        assert!(!props.is_owner);
        assert_eq!(props.approved_at.as_deref(), Some("2026-10-16T08:00:00+00:00"));
    }

    #[test]
    fn test_staff_is_never_redacted() {
        let owner = user(false);
        let staff = user(true);
        let booked = event(&owner, true);

        let view = project(&booked, &staff, VisibilityPolicy::Redacted, Tz::UTC);
        assert_eq!(view.title, "Therapy – J. Doe");
    }

    #[test]
    fn test_foreign_pending_is_invisible_to_clients() {
        let owner = user(false);
        let other = user(false);
        let staff = user(true);
        let pending = event(&owner, false);

        assert!(is_visible(&pending, &owner));
        assert!(!is_visible(&pending, &other));
        assert!(is_visible(&pending, &staff));
    }

    #[test]
    fn test_policy_parses_case_insensitively() {
        assert_eq!("FULL".parse::<VisibilityPolicy>(), Ok(VisibilityPolicy::Full));
        assert_eq!(" redacted ".parse::<VisibilityPolicy>(), Ok(VisibilityPolicy::Redacted));
        assert!("public".parse::<VisibilityPolicy>().is_err());
        assert_eq!(VisibilityPolicy::default().to_string(), "redacted");
    }

    #[test]
    fn test_serializes_calendar_field_names() {
        let client = user(false);
        let view = project(&event(&client, true), &client, VisibilityPolicy::Full, Tz::UTC);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("isApproved").is_some());
        assert!(json.get("backgroundColor").is_some());
        assert!(json.get("borderColor").is_some());
        assert!(json["extendedProps"].get("createdBy").is_some());
    }
}
