use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::{Event, User};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers appointment notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn appointment_approved(&self, recipient: &User, event: &Event) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl MailMessage {
    pub fn approval(from: &str, recipient: &User, event: &Event, tz: Tz) -> Self {
        let start = event.start.with_timezone(&tz);
        Self {
            from: from.to_string(),
            to: recipient.email.clone(),
            subject: "Your appointment has been approved".to_string(),
            body: format!(
                "Hello {},\n\nYour appointment \"{}\" on {} at {} has been approved.\n",
                recipient.display_name(),
                event.name,
                start.format("%A %d %B %Y"),
                start.format("%H:%M"),
            ),
        }
    }
}

/// Writes notifications to the log instead of sending them. Used when no
/// mail relay is configured.
pub struct LogNotifier {
    from: String,
    timezone: Tz,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>, timezone: Tz) -> Self {
        Self {
            from: from.into(),
            timezone,
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn appointment_approved(&self, recipient: &User, event: &Event) -> Result<(), NotifyError> {
        let message = MailMessage::approval(&self.from, recipient, event, self.timezone);
        info!(to = %message.to, subject = %message.subject, event_id = %event.id, "Approval notification (log only)");
        Ok(())
    }
}

/// Posts notifications as JSON to an HTTP mail relay.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
    from: String,
    timezone: Tz,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>, timezone: Tz) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            from: from.into(),
            timezone,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn appointment_approved(&self, recipient: &User, event: &Event) -> Result<(), NotifyError> {
        let message = MailMessage::approval(&self.from, recipient, event, self.timezone);

        let response = self.client.post(&self.endpoint).json(&message).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }

        info!(to = %message.to, event_id = %event.id, "Approval notification sent");
        Ok(())
    }
}
