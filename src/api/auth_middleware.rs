//! Request authentication gate.
//!
//! Extracts the bearer token from the Authorization header, verifies it via
//! the token issuer, and attaches the authenticated account id to the
//! request. A pure gate: it authenticates, it does not authorize specific
//! resources — downstream lookups are already scoped to the account id.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::token::TokenIssuer;


/// Authenticated account id, inserted as a request extension by
/// [`require_auth`]. Request-scoped; never shared across requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuthenticatedUser(pub i64);

/// Bearer-token extraction errors
#[derive(Debug, PartialEq, Clone)]
pub enum TokenExtractError {
    /// Authorization header not present
    Missing,
    /// Not "Bearer <token>" or header contains non-ASCII bytes
    InvalidFormat,
    /// Token is empty string
    Empty,
}

impl std::fmt::Display for TokenExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenExtractError::Missing => write!(f, "Authorization header missing"),
            TokenExtractError::InvalidFormat => {
                write!(f, "Invalid authorization header format")
            }
            TokenExtractError::Empty => write!(f, "Authorization token is empty"),
        }
    }
}

impl std::error::Error for TokenExtractError {}

/// Gate failures. Both map to 401; the distinction feeds the response
/// message only, never a different status.
#[derive(Debug, PartialEq)]
pub enum AuthError {
    MissingOrMalformed(TokenExtractError),
    InvalidOrExpired,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingOrMalformed(e) => write!(f, "{}", e),
            AuthError::InvalidOrExpired => write!(f, "Invalid or expired token"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
/// Returns the token string if present and valid.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenExtractError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(TokenExtractError::Missing)?
        .to_str()
        .map_err(|_| TokenExtractError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

/// Parse bearer token from Authorization header value
fn parse_bearer_token(header_value: &str) -> Result<String, TokenExtractError> {
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 {
        return Err(TokenExtractError::InvalidFormat);
    }

    if parts[0].to_lowercase() != "bearer" {
        return Err(TokenExtractError::InvalidFormat);
    }

    let token = parts[1].trim();
    if token.is_empty() {
        return Err(TokenExtractError::Empty);
    }

    Ok(token.to_string())
}

/// Authenticates a request from its headers, yielding the account id.
pub fn authenticate(headers: &HeaderMap, issuer: &TokenIssuer) -> Result<i64, AuthError> {
    let token = extract_bearer_token(headers).map_err(AuthError::MissingOrMalformed)?;
    issuer.verify(&token).ok_or(AuthError::InvalidOrExpired)
}

/// Axum middleware layer that runs the gate and inserts
/// [`AuthenticatedUser`] for the downstream handler.
pub async fn require_auth(
    State(issuer): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user_id = authenticate(request.headers(), &issuer)?;
    request.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}
