//! Account registration, login, and credential lookup.
//!
//! `AccountService` orchestrates the store, the cipher, and the token issuer.
//! It is the only place the third-party secret is in plaintext, and only for
//! the duration of a single call.

use anyhow::{Context, Result};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::credentials::{CredentialCipher, PlainCredentials};
use crate::store::{InsertError, UserStore};
use crate::token::TokenIssuer;

/// Username length bounds.
const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 30;

/// Minimum length for the third-party secret.
const SECRET_MIN_LEN: usize = 8;

/// Input validation failures, one variant per caller-correctable cause.
#[derive(Debug, PartialEq, Clone)]
pub enum ValidationError {
    UsernameTooShort,
    UsernameTooLong,
    UsernameInvalidCharacters,
    InvalidExternalIdentity,
    SecretTooShort,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UsernameTooShort => write!(
                f,
                "Username too short (minimum {} characters)",
                USERNAME_MIN_LEN
            ),
            ValidationError::UsernameTooLong => write!(
                f,
                "Username too long (maximum {} characters)",
                USERNAME_MAX_LEN
            ),
            ValidationError::UsernameInvalidCharacters => write!(
                f,
                "Username may only contain letters, digits, underscores, and hyphens"
            ),
            ValidationError::InvalidExternalIdentity => {
                write!(f, "External identity must be a valid email address")
            }
            ValidationError::SecretTooShort => write!(
                f,
                "Secret too short (minimum {} characters)",
                SECRET_MIN_LEN
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates the username shape: 3-30 characters, alphanumeric plus
/// underscore and hyphen. Uniqueness is case-sensitive.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < USERNAME_MIN_LEN {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > USERNAME_MAX_LEN {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::UsernameInvalidCharacters);
    }
    Ok(())
}

/// Validates that the external identity is email-shaped: a non-empty local
/// part, one `@`, and a domain containing a dot.
pub fn validate_external_identity(identity: &str) -> Result<(), ValidationError> {
    let mut parts = identity.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    if local.is_empty()
        || domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || domain.contains('@')
        || identity.contains(char::is_whitespace)
    {
        return Err(ValidationError::InvalidExternalIdentity);
    }
    Ok(())
}

fn validate_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.len() < SECRET_MIN_LEN {
        return Err(ValidationError::SecretTooShort);
    }
    Ok(())
}

/// Registration failures.
#[derive(Debug)]
pub enum RegisterError {
    /// Malformed input; the caller can correct and retry
    Validation(ValidationError),
    /// Username already taken
    DuplicateUsername,
    /// Storage or cipher failure; detail goes to the log, not the caller
    Internal(anyhow::Error),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::Validation(e) => write!(f, "{}", e),
            RegisterError::DuplicateUsername => write!(f, "Username already exists"),
            RegisterError::Internal(e) => write!(f, "Internal failure: {}", e),
        }
    }
}

impl std::error::Error for RegisterError {}

/// Login failures. Every authentication failure collapses into
/// `InvalidCredentials` so a response cannot reveal which field was wrong.
#[derive(Debug)]
pub enum LoginError {
    InvalidCredentials,
    Internal(anyhow::Error),
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginError::InvalidCredentials => write!(f, "Invalid credentials"),
            LoginError::Internal(e) => write!(f, "Internal failure: {}", e),
        }
    }
}

impl std::error::Error for LoginError {}

/// Orchestrates registration, login, and credential lookup.
#[derive(Debug)]
pub struct AccountService {
    store: UserStore,
    cipher: CredentialCipher,
    issuer: TokenIssuer,
}

impl AccountService {
    pub fn new(store: UserStore, cipher: CredentialCipher, issuer: TokenIssuer) -> Self {
        Self {
            store,
            cipher,
            issuer,
        }
    }

    /// Registers a new account and returns `(user_id, session_token)`.
    ///
    /// Input is validated before storage is touched; the secret is encrypted
    /// before the row is written. Duplicate usernames surface from the
    /// storage engine's uniqueness constraint.
    pub fn register(
        &self,
        username: &str,
        external_identity: &str,
        secret: &str,
    ) -> Result<(i64, String), RegisterError> {
        validate_username(username).map_err(RegisterError::Validation)?;
        validate_external_identity(external_identity).map_err(RegisterError::Validation)?;
        validate_secret(secret).map_err(RegisterError::Validation)?;

        let encrypted_secret = self
            .cipher
            .encrypt(secret)
            .context("Failed to encrypt secret")
            .map_err(RegisterError::Internal)?;

        let user_id = self
            .store
            .insert(username, external_identity, &encrypted_secret)
            .map_err(|e| match e {
                InsertError::DuplicateUsername => RegisterError::DuplicateUsername,
                InsertError::Storage(e) => RegisterError::Internal(e),
            })?;

        let token = self
            .issuer
            .issue(user_id)
            .context("Failed to issue session token")
            .map_err(RegisterError::Internal)?;

        Ok((user_id, token))
    }

    /// Authenticates an account and returns `(user_id, session_token)`.
    ///
    /// Unknown usernames, identity mismatches, wrong secrets, and stored
    /// secrets that fail to decrypt all yield `InvalidCredentials`. Both the
    /// external identity and the secret must match the stored values.
    pub fn login(
        &self,
        username: &str,
        external_identity: &str,
        secret: &str,
    ) -> Result<(i64, String), LoginError> {
        let account = self
            .store
            .find_by_username(username)
            .map_err(LoginError::Internal)?
            .ok_or(LoginError::InvalidCredentials)?;

        let stored_secret = match self.cipher.decrypt(&account.encrypted_secret) {
            Ok(secret) => secret,
            Err(e) => {
                // Key mismatch after a key rotation lands here. The caller
                // sees a normal authentication failure; the operator log
                // carries the cause.
                warn!(user_id = account.id, error = %e, "Failed to decrypt stored secret during login");
                return Err(LoginError::InvalidCredentials);
            }
        };

        let identity_matches = external_identity == account.external_identity;
        let secret_matches: bool = secret.as_bytes().ct_eq(stored_secret.as_bytes()).into();

        if !(identity_matches && secret_matches) {
            return Err(LoginError::InvalidCredentials);
        }

        let token = self
            .issuer
            .issue(account.id)
            .context("Failed to issue session token")
            .map_err(LoginError::Internal)?;

        Ok((account.id, token))
    }

    /// Returns the decrypted credentials for an account, or `None` if the
    /// account does not exist.
    ///
    /// Used by the reminders collaborator to drive exactly one outbound
    /// call. Callers must not cache or log the plaintext. A decryption
    /// failure here is operator-facing (key mismatch), not a caller error.
    pub fn get_credentials_for_user(&self, user_id: i64) -> Result<Option<PlainCredentials>> {
        let account = match self.store.find_by_id(user_id)? {
            Some(account) => account,
            None => return Ok(None),
        };

        let secret = self.cipher.decrypt(&account.encrypted_secret).map_err(|e| {
            error!(user_id, "Failed to decrypt stored credentials");
            anyhow::Error::new(e).context("Failed to decrypt stored credentials")
        })?;

        Ok(Some(PlainCredentials {
            external_identity: account.external_identity,
            secret,
        }))
    }
}

#[cfg(test)]
mod tests;
