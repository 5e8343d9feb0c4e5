pub mod appointments;
pub mod notifier;
pub mod visibility;

pub use appointments::{AppointmentService, CreateAppointment};
pub use notifier::{LogNotifier, Notifier, NotifyError, WebhookNotifier};
pub use visibility::{project, PublicEvent, VisibilityPolicy};
