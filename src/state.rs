use std::sync::Arc;

use chrono_tz::Tz;

use crate::services::{AppointmentService, Notifier, VisibilityPolicy};
use crate::store::Store;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub appointments: AppointmentService,
    pub visibility: VisibilityPolicy,
    pub timezone: Tz,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        visibility: VisibilityPolicy,
        timezone: Tz,
    ) -> Self {
        Self {
            appointments: AppointmentService::new(Arc::clone(&store), notifier),
            store,
            visibility,
            timezone,
        }
    }
}
