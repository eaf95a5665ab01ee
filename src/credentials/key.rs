//! Encryption-key provisioning.
//!
//! Preference order:
//! 1. Externally supplied key (config/env) — required for multi-instance
//!    deployments where every process must share one key.
//! 2. Persisted key file, generated on first run.
//! 3. In-memory key if the file cannot be written (read-only filesystem).
//!    Secrets encrypted under an in-memory key are unrecoverable after a
//!    restart, so this path logs a degraded-durability warning.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use std::path::Path;
use tracing::{info, warn};

use super::cipher::{validate_key, KEY_SIZE};

/// Generates a fresh random 256-bit key, base64-encoded.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}

/// Resolves the process-wide encryption key.
///
/// `configured` is the externally supplied base64 key, if any; `key_file` is
/// the fallback location for a locally persisted key.
pub fn load_key(configured: Option<&str>, key_file: &Path) -> Result<Vec<u8>> {
    if let Some(key) = configured {
        return validate_key(key).context("Configured encryption key is invalid");
    }

    if key_file.exists() {
        let contents = std::fs::read_to_string(key_file)
            .with_context(|| format!("Failed to read key file {}", key_file.display()))?;
        let key = validate_key(&contents)
            .with_context(|| format!("Key file {} is invalid", key_file.display()))?;
        info!(path = %key_file.display(), "Loaded encryption key from key file");
        return Ok(key);
    }

    let generated = generate_key();
    match std::fs::write(key_file, &generated) {
        Ok(()) => info!(path = %key_file.display(), "Generated new encryption key file"),
        Err(e) => warn!(
            path = %key_file.display(),
            error = %e,
            "Could not persist encryption key file; using in-memory key. \
             Stored secrets will be unrecoverable after restart."
        ),
    }

    validate_key(&generated).context("Generated key failed validation")
}
