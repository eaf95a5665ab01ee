//! Protected pass-through routes to the external reminders provider.
//!
//! Every route sits behind the auth gate. The authenticated account's
//! credentials are decrypted, used for exactly one provider call, and
//! dropped; they never appear in a response or a log line.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::account::AccountService;
use crate::api::auth::ErrorResponse;
use crate::api::auth_middleware::{require_auth, AuthenticatedUser};
use crate::credentials::PlainCredentials;
use crate::reminders::{CompletionStatus, ProviderError, Reminder, ReminderList, RemindersProvider};
use crate::token::TokenIssuer;

/// Shared state for the reminders router
#[derive(Clone)]
pub struct RemindersAppState {
    pub accounts: Arc<AccountService>,
    pub provider: Arc<dyn RemindersProvider>,
}

#[derive(Serialize, Deserialize)]
pub struct ListsResponse {
    pub lists: Vec<ReminderList>,
}

#[derive(Serialize, Deserialize)]
pub struct RemindersResponse {
    pub reminders: Vec<Reminder>,
}

#[derive(Deserialize)]
pub struct CreateReminderRequest {
    pub list_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateReminderResponse {
    pub success: bool,
    pub reminder: Reminder,
}

#[derive(Deserialize)]
pub struct CompleteReminderRequest {
    pub list_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CompleteReminderResponse {
    pub success: bool,
}

/// Create the reminders API router, gated by `require_auth`.
pub fn create_reminders_router(state: RemindersAppState, issuer: Arc<TokenIssuer>) -> Router {
    Router::new()
        .route("/api/reminders/lists", get(list_reminder_lists))
        .route("/api/reminders/list/:list_id", get(get_reminders))
        .route("/api/reminders", post(create_reminder))
        .route("/api/reminders/:reminder_id/complete", post(complete_reminder))
        .layer(middleware::from_fn_with_state(issuer, require_auth))
        .with_state(state)
}

/// GET /api/reminders/lists - All reminder lists for the authenticated user
async fn list_reminder_lists(
    State(state): State<RemindersAppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<Json<ListsResponse>, ReminderApiError> {
    let creds = credentials_for(&state, user_id)?;

    let lists = state
        .provider
        .list_collections(&creds)
        .await
        .map_err(ReminderApiError::Provider)?;

    Ok(Json(ListsResponse { lists }))
}

/// GET /api/reminders/list/:list_id - Reminders in one list
async fn get_reminders(
    State(state): State<RemindersAppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(list_id): Path<String>,
) -> Result<Json<RemindersResponse>, ReminderApiError> {
    let creds = credentials_for(&state, user_id)?;

    let reminders = state
        .provider
        .list_reminders(&creds, &list_id)
        .await
        .map_err(ReminderApiError::Provider)?
        .ok_or(ReminderApiError::ListNotFound)?;

    Ok(Json(RemindersResponse { reminders }))
}

/// POST /api/reminders - Create a reminder in a list
async fn create_reminder(
    State(state): State<RemindersAppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<CreateReminderResponse>), ReminderApiError> {
    let (list_id, title) = match (request.list_id.as_deref(), request.title.as_deref()) {
        (Some(l), Some(t)) => (l, t),
        _ => return Err(ReminderApiError::MissingFields("list_id and title are required")),
    };
    let description = request.description.as_deref().unwrap_or_default();

    let creds = credentials_for(&state, user_id)?;

    let reminder = state
        .provider
        .create_reminder(&creds, list_id, title, description)
        .await
        .map_err(ReminderApiError::Provider)?
        .ok_or(ReminderApiError::ListNotFound)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReminderResponse {
            success: true,
            reminder,
        }),
    ))
}

/// POST /api/reminders/:reminder_id/complete - Mark a reminder completed
async fn complete_reminder(
    State(state): State<RemindersAppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(reminder_id): Path<String>,
    Json(request): Json<CompleteReminderRequest>,
) -> Result<Json<CompleteReminderResponse>, ReminderApiError> {
    let list_id = request
        .list_id
        .as_deref()
        .ok_or(ReminderApiError::MissingFields("list_id is required"))?;

    let creds = credentials_for(&state, user_id)?;

    match state
        .provider
        .complete_reminder(&creds, list_id, &reminder_id)
        .await
        .map_err(ReminderApiError::Provider)?
    {
        CompletionStatus::Completed => Ok(Json(CompleteReminderResponse { success: true })),
        CompletionStatus::ListNotFound => Err(ReminderApiError::ListNotFound),
        CompletionStatus::ReminderNotFound => Err(ReminderApiError::ReminderNotFound),
    }
}

/// Resolves the authenticated account's decrypted credentials for one call.
fn credentials_for(
    state: &RemindersAppState,
    user_id: i64,
) -> Result<PlainCredentials, ReminderApiError> {
    state
        .accounts
        .get_credentials_for_user(user_id)
        .map_err(ReminderApiError::Internal)?
        .ok_or(ReminderApiError::CredentialsNotFound)
}

/// Reminders API error types
enum ReminderApiError {
    MissingFields(&'static str),
    ListNotFound,
    ReminderNotFound,
    /// Token resolved to an account with no stored credentials
    CredentialsNotFound,
    Provider(ProviderError),
    Internal(anyhow::Error),
}

impl IntoResponse for ReminderApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ReminderApiError::MissingFields(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            ReminderApiError::ListNotFound => {
                (StatusCode::NOT_FOUND, "List not found".to_string())
            }
            ReminderApiError::ReminderNotFound => {
                (StatusCode::NOT_FOUND, "Reminder not found".to_string())
            }
            ReminderApiError::CredentialsNotFound => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "User credentials not found".to_string(),
            ),
            ReminderApiError::Provider(ProviderError::ChallengeRequired) => (
                StatusCode::BAD_GATEWAY,
                "External provider requires additional authentication".to_string(),
            ),
            ReminderApiError::Provider(ProviderError::Unavailable(detail)) => {
                error!(detail = %detail, "Reminders provider unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "External reminders provider unavailable".to_string(),
                )
            }
            ReminderApiError::Internal(e) => {
                error!(error = %e, "Internal failure handling reminders request");
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
