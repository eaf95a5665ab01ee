//! AES-256-GCM encryption for stored third-party secrets.
//!
//! Each secret is encrypted with a unique random nonce. The nonce is prepended
//! to the ciphertext and the whole blob is base64-encoded, so a stored secret
//! is a single opaque string.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Cipher failures. Messages never include key material or plaintext.
#[derive(Debug)]
pub enum CipherError {
    /// Key is not valid base64 or not 32 bytes after decoding
    InvalidKey(String),
    /// Encryption failed (should not happen with a valid key)
    EncryptionFailed,
    /// Ciphertext blob is not valid base64 or too short to contain a nonce
    MalformedCiphertext(String),
    /// GCM tag verification failed: wrong key, corrupted, or tampered data
    DecryptionFailed,
}

impl std::fmt::Display for CipherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipherError::InvalidKey(msg) => write!(f, "Invalid encryption key: {}", msg),
            CipherError::EncryptionFailed => write!(f, "Encryption failed"),
            CipherError::MalformedCiphertext(msg) => {
                write!(f, "Malformed ciphertext: {}", msg)
            }
            CipherError::DecryptionFailed => {
                write!(f, "Decryption failed (wrong key or corrupted data)")
            }
        }
    }
}

impl std::error::Error for CipherError {}

/// Validates that a base64-encoded key decodes to exactly 32 bytes.
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>, CipherError> {
    let key_bytes = BASE64
        .decode(key_base64.trim())
        .map_err(|e| CipherError::InvalidKey(format!("not valid base64: {}", e)))?;

    if key_bytes.len() != KEY_SIZE {
        return Err(CipherError::InvalidKey(format!(
            "must be {} bytes (256 bits), got {} bytes",
            KEY_SIZE,
            key_bytes.len()
        )));
    }

    Ok(key_bytes)
}

/// Authenticated symmetric cipher for secrets at rest.
///
/// Holds the process-wide encryption key. Constructed explicitly from key
/// bytes so tests can build isolated instances with distinct keys; there is
/// no ambient or global key lookup.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Creates a cipher from raw key bytes. The key must be exactly 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            CipherError::InvalidKey(format!(
                "must be {} bytes (256 bits), got {} bytes",
                KEY_SIZE,
                key.len()
            ))
        })?;
        Ok(Self { cipher })
    }

    /// Encrypts a secret, returning a single base64 blob (nonce + ciphertext).
    ///
    /// A fresh random nonce is generated per call, so encrypting the same
    /// plaintext twice yields different blobs.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&blob))
    }

    /// Decrypts a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails on malformed input, a wrong key, or any tampering detected by
    /// tag verification. Never returns garbage plaintext.
    pub fn decrypt(&self, blob: &str) -> Result<String, CipherError> {
        let bytes = BASE64
            .decode(blob)
            .map_err(|e| CipherError::MalformedCiphertext(format!("not valid base64: {}", e)))?;

        if bytes.len() <= NONCE_SIZE {
            return Err(CipherError::MalformedCiphertext(format!(
                "blob too short: {} bytes",
                bytes.len()
            )));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}
