//! Shared harness: the full router over an in-memory store.

#![allow(dead_code)]

pub mod pg;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use ortho_server::auth::USER_ID_HEADER;
use ortho_server::models::{Availability, User};
use ortho_server::routes::create_routes;
use ortho_server::services::{LogNotifier, VisibilityPolicy};
use ortho_server::state::AppState;
use ortho_server::store::MemoryStore;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub staff: User,
    pub client: User,
    pub other_client: User,
}

pub fn user(username: &str, full_name: &str, is_staff: bool) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        full_name: full_name.to_string(),
        email: format!("{}@example.com", username),
        is_staff,
        created_at: now,
        updated_at: now,
    }
}

impl TestApp {
    pub async fn new(visibility: VisibilityPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let staff = user("doctor", "Dr. Martin", true);
        let client = user("alice", "Alice Client", false);
        let other_client = user("bob", "Bob Client", false);
        for u in [&staff, &client, &other_client] {
            store.add_user(u.clone()).await;
        }
        store
            .add_availability(Availability {
                id: Uuid::new_v4(),
                weekday: 2,
                start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            })
            .await;
        store
            .add_availability(Availability {
                id: Uuid::new_v4(),
                weekday: 0,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            })
            .await;

        let state = AppState::new(
            store.clone(),
            Arc::new(LogNotifier::new("clinic@example.com", Tz::UTC)),
            visibility,
            Tz::UTC,
        );

        Self {
            router: create_routes(state),
            store,
            staff,
            client,
            other_client,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(USER_ID_HEADER, actor.id.to_string());
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Creates an event and returns its id, asserting 201.
    pub async fn book(&self, actor: &User, title: &str, start: &str, end: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/events",
                Some(actor),
                Some(serde_json::json!({ "title": title, "start": start, "end": end })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn list(&self, actor: &User) -> Vec<Value> {
        let (status, body) = self.request(Method::GET, "/events", Some(actor), None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().unwrap().clone()
    }
}
