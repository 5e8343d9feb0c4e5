pub mod availability;
pub mod event;
pub mod user;

pub use availability::{Availability, AvailabilityWindow};
pub use event::{intervals_overlap, Event, EventChanges, EventStatus, NewEvent};
pub use user::{ClientSummary, User, UserProfile};
