use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;

use crate::services::{LogNotifier, Notifier, VisibilityPolicy, WebhookNotifier};

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ortho";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_FROM_ADDRESS: &str = "no-reply@clinic.local";

pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub timezone: Tz,
    pub visibility: VisibilityPolicy,
    pub notify_webhook_url: Option<String>,
    pub notify_from_address: String,
}

/// Parses `raw` when present, falling back to `default` with a warning when
/// the value does not parse.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Config: invalid {} '{}': {}, using default", key, value, e);
                default
            }
        },
        None => default,
    }
}

fn non_empty(value: Result<String, env::VarError>) -> Option<String> {
    value.ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| non_empty(env::var(key)))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr = SocketAddr::from(([0, 0, 0, 0], 3001));

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            ),
            bind_addr: parse_or("BIND_ADDR", lookup("BIND_ADDR"), default_addr),
            timezone: parse_or("CLINIC_TIMEZONE", lookup("CLINIC_TIMEZONE"), Tz::UTC),
            visibility: parse_or(
                "EVENT_VISIBILITY",
                lookup("EVENT_VISIBILITY"),
                VisibilityPolicy::default(),
            ),
            notify_webhook_url: lookup("NOTIFY_WEBHOOK_URL"),
            notify_from_address: lookup("NOTIFY_FROM_ADDRESS")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
        }
    }

    /// Webhook relay when configured, log-only delivery otherwise.
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        match &self.notify_webhook_url {
            Some(url) => {
                tracing::info!("Notifications: relaying approvals to {}", url);
                Arc::new(WebhookNotifier::new(
                    url.clone(),
                    self.notify_from_address.clone(),
                    self.timezone,
                ))
            }
            None => {
                tracing::info!("Notifications: no relay configured, logging only");
                Arc::new(LogNotifier::new(
                    self.notify_from_address.clone(),
                    self.timezone,
                ))
            }
        }
    }
}
