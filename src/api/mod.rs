// HTTP API: auth endpoints, the request gate, and reminders pass-through

pub mod auth;
pub mod auth_middleware;
pub mod reminders;

pub use auth::{create_auth_router, AuthAppState, AuthResponse, ErrorResponse};
pub use auth_middleware::{authenticate, extract_bearer_token, require_auth, AuthenticatedUser};
pub use reminders::{create_reminders_router, RemindersAppState};

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};

/// Create the health-check router (unauthenticated)
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// GET /health
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
