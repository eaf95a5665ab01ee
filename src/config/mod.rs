//! Environment-derived configuration.
//!
//! In production mode the signing secret and encryption key are mandatory:
//! startup fails fast rather than falling back to an insecure default. In
//! development the JWT secret falls back to a random per-process value and
//! the encryption key to a local key file.

use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::warn;

/// Deployment mode, from `REMVAULT_ENV`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deployment {
    Development,
    Production,
}

/// Complete remvault configuration
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Where account rows persist
    pub database_path: String,
    /// JWT signing secret (mandatory in production)
    pub signing_secret: Option<String>,
    /// Base64-encoded 32-byte encryption key (mandatory in production)
    pub encryption_key: Option<String>,
    /// Fallback location for a locally persisted encryption key
    pub key_file: PathBuf,
    pub deployment: Deployment,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            database_path: "users.db".to_string(),
            signing_secret: None,
            encryption_key: None,
            key_file: PathBuf::from(".encryption_key"),
            deployment: Deployment::Development,
        }
    }
}

impl VaultConfig {
    /// Build from env vars, falling back to defaults.
    ///
    /// Fails when `REMVAULT_ENV=production` and either secret is absent.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        cfg.deployment = match std::env::var("REMVAULT_ENV").as_deref() {
            Ok("production") => Deployment::Production,
            _ => Deployment::Development,
        };

        if let Ok(v) = std::env::var("REMVAULT_DATABASE_PATH") {
            cfg.database_path = v;
        }
        if let Ok(v) = std::env::var("REMVAULT_KEY_FILE") {
            cfg.key_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REMVAULT_BIND_ADDR") {
            cfg.bind_addr = v;
        } else if let Ok(port) = std::env::var("PORT") {
            cfg.bind_addr = format!("0.0.0.0:{}", port);
        }

        cfg.signing_secret = std::env::var("REMVAULT_JWT_SECRET").ok();
        cfg.encryption_key = std::env::var("REMVAULT_ENCRYPTION_KEY").ok();

        if cfg.deployment == Deployment::Production {
            if cfg.signing_secret.is_none() {
                bail!("REMVAULT_JWT_SECRET must be set in production");
            }
            if cfg.encryption_key.is_none() {
                bail!("REMVAULT_ENCRYPTION_KEY must be set in production");
            }
        }

        Ok(cfg)
    }

    /// The JWT signing secret, generating a random per-process secret in
    /// development when none is configured. Sessions signed with a generated
    /// secret do not survive a restart.
    pub fn resolve_signing_secret(&self) -> String {
        match &self.signing_secret {
            Some(secret) => secret.clone(),
            None => {
                warn!(
                    "REMVAULT_JWT_SECRET not set; using a random per-process secret. \
                     Sessions will not survive restart."
                );
                crate::credentials::generate_key()
            }
        }
    }
}
