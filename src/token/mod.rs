//! Session token issuance and verification.
//!
//! Tokens are stateless HS256 JWTs carrying the account id and an absolute
//! expiry. Nothing is persisted server-side and there is no revocation list:
//! a token stays valid until its expiry elapses, after which the client must
//! re-authenticate.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Default session lifetime: 30 days.
pub const DEFAULT_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// JWT claims. The payload is integrity-protected, not encrypted; it carries
/// nothing sensitive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Claims {
    /// Account id
    user_id: i64,
    /// Expiration timestamp (Unix)
    exp: u64,
    /// Issued at timestamp (Unix)
    iat: u64,
}

/// Token issuance errors. Verification failures are not errors; `verify`
/// fails closed to `None`.
#[derive(Debug)]
pub enum TokenError {
    Generation(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Generation(msg) => write!(f, "Token generation failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// Mints and verifies signed, time-bound session tokens.
///
/// Constructed explicitly from the signing secret; no ambient secret lookup,
/// so tests can build issuers with distinct secrets.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenIssuer {
    /// Creates an issuer from the signing secret.
    ///
    /// `ttl_secs` overrides the default 30-day session lifetime.
    pub fn new(secret: &str, ttl_secs: Option<u64>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_secs.unwrap_or(DEFAULT_TTL_SECS),
        }
    }

    /// Issues a signed token for an account, expiring `ttl_secs` from now.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TokenError::Generation(e.to_string()))?
            .as_secs();

        let claims = Claims {
            user_id,
            exp: now + self.ttl_secs,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verifies a token and returns the embedded account id.
    ///
    /// Fails closed: malformed tokens, bad signatures, and expired tokens
    /// all yield `None`. The causes are distinguished only in the log.
    pub fn verify(&self, token: &str) -> Option<i64> {
        let validation = Validation::default();

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims.user_id),
            Err(e) => {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        warn!("Session token expired");
                    }
                    _ => {
                        warn!("Invalid session token");
                    }
                }
                None
            }
        }
    }

    /// Configured session lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
