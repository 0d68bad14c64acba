// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-scoped encryption for relay message bodies.
//!
//! Bodies travel through the mediator as `base64(nonce || ciphertext || tag)`
//! under AES-256-GCM. The AES key is SHA-256 of the raw bytes behind the
//! session's hex encryption key, so every committee member derives the same
//! key from the shared session descriptor.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use alloy::hex;
use base64ct::{Base64, Encoding};
use sha2::{Digest, Sha256};

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Errors raised while sealing or opening relay bodies.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid session key: {0}")]
    InvalidKey(String),

    #[error("Invalid message body encoding: {0}")]
    InvalidEncoding(String),

    #[error("Message body too short ({0} bytes)")]
    Truncated(usize),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed")]
    Decrypt,
}

/// Symmetric cipher shared by every party of one session.
#[derive(Clone)]
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl SessionCipher {
    /// Build the cipher from the session's hex encryption key.
    pub fn from_hex_key(encryption_key_hex: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(encryption_key_hex.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        if raw.is_empty() {
            return Err(CryptoError::InvalidKey("empty key".to_string()));
        }

        let digest = Sha256::digest(&raw);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest));
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` with a fresh random nonce and base64 the result.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(Base64::encode_string(&sealed))
    }

    /// Decode and decrypt a body produced by [`SessionCipher::seal`].
    pub fn open(&self, body: &str) -> Result<Vec<u8>, CryptoError> {
        let sealed = Base64::decode_vec(body.trim())
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        if sealed.len() <= NONCE_LEN {
            return Err(CryptoError::Truncated(sealed.len()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)
    }
}

/// Content hash of a plaintext body, as carried in `ProtocolMessage::hash`.
pub fn body_hash(plaintext: &[u8]) -> String {
    hex::encode(Sha256::digest(plaintext))
}

/// Generate a new random 32-byte session key, hex encoded.
pub fn generate_session_key() -> String {
    hex::encode(Aes256Gcm::generate_key(&mut OsRng))
}
