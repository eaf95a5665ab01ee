//! Pluggable external reminders provider.
//!
//! The vault never speaks the external reminders protocol itself; a deployment
//! supplies a [`RemindersProvider`] implementation, and the protected routes
//! hand it one account's decrypted credentials per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::PlainCredentials;

/// A reminder list (collection) as exposed by the external provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReminderList {
    pub id: String,
    pub title: String,
    pub color: Option<String>,
}

/// A single reminder item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: i64,
}

/// Outcome of a completion request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CompletionStatus {
    Completed,
    ListNotFound,
    ReminderNotFound,
}

/// Provider failures surfaced to the vault.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider demanded an interactive challenge (e.g. a two-factor
    /// code). The vault surfaces this as an opaque failure; it never
    /// orchestrates the challenge.
    ChallengeRequired,
    /// The provider could not be reached or rejected the call
    Unavailable(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::ChallengeRequired => {
                write!(f, "External provider requires additional authentication")
            }
            ProviderError::Unavailable(msg) => {
                write!(f, "External reminders provider unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// External reminders API, abstracted per-call.
///
/// Every method receives the calling account's decrypted credentials and
/// must use them for exactly that call; implementations must not cache or
/// log the plaintext.
#[async_trait]
pub trait RemindersProvider: Send + Sync {
    /// All reminder lists for the account.
    async fn list_collections(
        &self,
        creds: &PlainCredentials,
    ) -> Result<Vec<ReminderList>, ProviderError>;

    /// Reminders in one list; `None` if the list does not exist.
    async fn list_reminders(
        &self,
        creds: &PlainCredentials,
        list_id: &str,
    ) -> Result<Option<Vec<Reminder>>, ProviderError>;

    /// Creates a reminder; `None` if the list does not exist.
    async fn create_reminder(
        &self,
        creds: &PlainCredentials,
        list_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Option<Reminder>, ProviderError>;

    /// Marks a reminder completed.
    async fn complete_reminder(
        &self,
        creds: &PlainCredentials,
        list_id: &str,
        reminder_id: &str,
    ) -> Result<CompletionStatus, ProviderError>;
}
