use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A recurring weekly window during which the clinic takes appointments.
/// `weekday` counts from Monday = 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Availability {
    pub id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Availability {
    pub fn day(&self) -> Option<Weekday> {
        u8::try_from(self.weekday)
            .ok()
            .and_then(|day| Weekday::try_from(day).ok())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub weekday: i16,
    pub day: Option<String>,
    pub start_time: String,
    pub end_time: String,
}

impl From<&Availability> for AvailabilityWindow {
    fn from(window: &Availability) -> Self {
        Self {
            id: window.id,
            weekday: window.weekday,
            day: window.day().map(|day| day.to_string()),
            start_time: window.start_time.format("%H:%M").to_string(),
            end_time: window.end_time.format("%H:%M").to_string(),
        }
    }
}
