//! Registration and login endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::account::{AccountService, LoginError, RegisterError, ValidationError};

/// Shared state for the auth router
#[derive(Clone)]
pub struct AuthAppState {
    pub accounts: Arc<AccountService>,
}

/// Request body for both register and login.
///
/// Fields are `Option` so a missing field becomes a 400 with a clear message
/// instead of a framework-level deserialization rejection.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub external_identity: Option<String>,
    pub secret: Option<String>,
}

/// Successful register/login response
#[derive(Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user_id: i64,
}

/// Error response
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create the auth API router
pub fn create_auth_router(state: AuthAppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .with_state(state)
}

/// POST /api/auth/register - Create an account and issue a session token
async fn register(
    State(state): State<AuthAppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthApiError> {
    let (username, external_identity, secret) = require_fields(&request)?;

    let (user_id, token) = state
        .accounts
        .register(username, external_identity, secret)
        .map_err(|e| match e {
            RegisterError::Validation(e) => AuthApiError::Validation(e),
            RegisterError::DuplicateUsername => AuthApiError::DuplicateUsername,
            RegisterError::Internal(e) => AuthApiError::Internal(e),
        })?;

    info!(user_id, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user_id,
        }),
    ))
}

/// POST /api/auth/login - Authenticate and issue a session token
async fn login(
    State(state): State<AuthAppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AuthApiError> {
    let (username, external_identity, secret) = require_fields(&request)?;

    let (user_id, token) = state
        .accounts
        .login(username, external_identity, secret)
        .map_err(|e| match e {
            LoginError::InvalidCredentials => AuthApiError::InvalidCredentials,
            LoginError::Internal(e) => AuthApiError::Internal(e),
        })?;

    info!(user_id, "Login succeeded");

    Ok(Json(AuthResponse {
        success: true,
        token,
        user_id,
    }))
}

fn require_fields(request: &CredentialsRequest) -> Result<(&str, &str, &str), AuthApiError> {
    match (
        request.username.as_deref(),
        request.external_identity.as_deref(),
        request.secret.as_deref(),
    ) {
        (Some(u), Some(i), Some(s)) => Ok((u, i, s)),
        _ => Err(AuthApiError::MissingFields),
    }
}

/// Auth API error types
enum AuthApiError {
    MissingFields,
    Validation(ValidationError),
    DuplicateUsername,
    InvalidCredentials,
    Internal(anyhow::Error),
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthApiError::MissingFields => (
                StatusCode::BAD_REQUEST,
                "username, external_identity, and secret are required".to_string(),
            ),
            AuthApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AuthApiError::DuplicateUsername => (
                StatusCode::BAD_REQUEST,
                "Username already exists".to_string(),
            ),
            AuthApiError::InvalidCredentials => {
                // Deliberately vague: the same message for every
                // authentication failure, so responses cannot be used to
                // enumerate usernames.
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AuthApiError::Internal(e) => {
                // Full detail to the operational log only
                error!(error = %e, "Internal failure handling auth request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
