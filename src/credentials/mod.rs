//! Encryption at rest for third-party secrets.
//!
//! Accounts store the external service password encrypted with AES-256-GCM;
//! the only component that ever sees the key is [`CredentialCipher`]. Key
//! provisioning (env-supplied key, key file, or in-memory fallback) lives in
//! [`key`].
//!
//! # Security
//!
//! - Every secret is encrypted with a unique random nonce (never reused)
//! - Authenticated encryption: tampering is detected at decrypt time
//! - The key is held in memory only and never exposed outside the cipher
//! - Decrypted secrets exist only for the duration of one outbound call and
//!   are never logged or persisted

mod cipher;
mod key;

pub use cipher::{validate_key, CipherError, CredentialCipher, KEY_SIZE};
pub use key::{generate_key, load_key};

/// Decrypted third-party credentials for one account.
///
/// Handed to the reminders collaborator for exactly one outbound call.
/// Callers must not cache or log the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct PlainCredentials {
    /// Third-party account identifier (email-shaped)
    pub external_identity: String,

    /// Decrypted third-party password
    pub secret: String,
}

// Manual Debug so the secret can never leak through `{:?}` formatting.
impl std::fmt::Debug for PlainCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainCredentials")
            .field("external_identity", &self.external_identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}
