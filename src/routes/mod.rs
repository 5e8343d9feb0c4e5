use axum::{
    routing::{get, patch, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::availability::list_availability;
use crate::handlers::events::{approve_event, create_event, delete_event, list_events, update_event};
use crate::handlers::health_check;
use crate::handlers::users::{current_user, get_user, list_users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            put(update_event).patch(update_event).delete(delete_event),
        )
        .route("/events/:id/approve", patch(approve_event).post(approve_event))
        .route("/users", get(list_users))
        .route("/users/me", get(current_user))
        .route("/users/:id", get(get_user))
        .route("/availability", get(list_availability))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}
