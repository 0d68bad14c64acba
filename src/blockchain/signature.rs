// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signatures returned by the TSS engine and their chain-native encodings.

use std::collections::HashMap;

use alloy::hex;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// One engine-produced signature over a pre-signed image hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignSignature {
    /// The signed hash, hex.
    pub msg: String,
    /// Big-endian scalar, hex.
    pub r: String,
    /// Big-endian scalar, hex.
    pub s: String,
    /// DER encoding of (r, s), hex. Empty for ed25519.
    #[serde(default)]
    pub der_signature: String,
    /// secp256k1 recovery id (0 or 1).
    #[serde(default)]
    pub recovery_id: u8,
}

/// Signatures keyed by the hex hash they sign.
pub type SignatureMap = HashMap<String, KeysignSignature>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid hex in `{0}`")]
    Hex(&'static str),

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("invalid public key: {0}")]
    PublicKey(String),

    #[error("signature does not verify against the coin public key")]
    Mismatch,
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, SignatureError> {
    hex::decode(value.trim().trim_start_matches("0x")).map_err(|_| SignatureError::Hex(field))
}

/// Left-pad a big-endian scalar to 32 bytes.
fn scalar_bytes(field: &'static str, value: &str) -> Result<[u8; 32], SignatureError> {
    let bytes = decode_hex(field, value)?;
    let trimmed = match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => &[][..],
    };
    if trimmed.len() > 32 {
        return Err(SignatureError::Malformed(format!("`{field}` longer than 32 bytes")));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

impl KeysignSignature {
    /// secp256k1 signature, from r/s when present, DER otherwise. Low-S
    /// normalised.
    pub fn ecdsa(&self) -> Result<Signature, SignatureError> {
        let signature = self.raw_ecdsa()?;
        Ok(signature.normalize_s().unwrap_or(signature))
    }

    fn raw_ecdsa(&self) -> Result<Signature, SignatureError> {
        if !self.r.is_empty() && !self.s.is_empty() {
            let mut bytes = [0u8; 64];
            bytes[..32].copy_from_slice(&scalar_bytes("r", &self.r)?);
            bytes[32..].copy_from_slice(&scalar_bytes("s", &self.s)?);
            Signature::from_slice(&bytes).map_err(|e| SignatureError::Malformed(e.to_string()))
        } else {
            let der = decode_hex("der_signature", &self.der_signature)?;
            Signature::from_der(&der).map_err(|e| SignatureError::Malformed(e.to_string()))
        }
    }

    /// 64-byte ed25519 signature `R ‖ S`.
    pub fn ed25519(&self) -> Result<[u8; 64], SignatureError> {
        let r = decode_hex("r", &self.r)?;
        let s = decode_hex("s", &self.s)?;
        if r.len() != 32 || s.len() != 32 {
            return Err(SignatureError::Malformed(format!(
                "ed25519 halves must be 32 bytes, got {} and {}",
                r.len(),
                s.len()
            )));
        }
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&r);
        out[32..].copy_from_slice(&s);
        Ok(out)
    }
}

pub fn verifying_key(hex_public_key: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = decode_hex("hex_public_key", hex_public_key)?;
    VerifyingKey::from_sec1_bytes(&bytes).map_err(|e| SignatureError::PublicKey(e.to_string()))
}

/// Verify a low-S ECDSA signature over `prehash` and return its DER bytes.
pub fn verified_der(
    signature: &KeysignSignature,
    key: &VerifyingKey,
    prehash: &[u8; 32],
) -> Result<Vec<u8>, SignatureError> {
    verified(signature, key, prehash).map(|signature| signature.to_der().as_bytes().to_vec())
}

/// Verify a low-S ECDSA signature over `prehash` and return `r ‖ s`.
pub fn verified_compact(
    signature: &KeysignSignature,
    key: &VerifyingKey,
    prehash: &[u8; 32],
) -> Result<[u8; 64], SignatureError> {
    let signature = verified(signature, key, prehash)?;
    let mut out = [0u8; 64];
    out.copy_from_slice(&signature.to_bytes());
    Ok(out)
}

fn verified(
    signature: &KeysignSignature,
    key: &VerifyingKey,
    prehash: &[u8; 32],
) -> Result<Signature, SignatureError> {
    let signature = signature.ecdsa()?;
    key.verify_prehash(prehash, &signature)
        .map_err(|_| SignatureError::Mismatch)?;
    Ok(signature)
}

/// Low-S signature plus y-parity whose recovered key equals `key`.
///
/// Normalising S negates the nonce point, so the parity flips with it.
pub fn recoverable(
    signature: &KeysignSignature,
    key: &VerifyingKey,
    prehash: &[u8; 32],
) -> Result<(Signature, bool), SignatureError> {
    let raw = signature.raw_ecdsa()?;

    if signature.recovery_id > 1 {
        return Err(SignatureError::Malformed(format!(
            "recovery id {} out of range",
            signature.recovery_id
        )));
    }
    let (normalized, parity) = match raw.normalize_s() {
        Some(low) => (low, signature.recovery_id ^ 1),
        None => (raw, signature.recovery_id),
    };

    let recovery_id = RecoveryId::from_byte(parity)
        .ok_or_else(|| SignatureError::Malformed("bad recovery id".to_string()))?;
    let recovered = VerifyingKey::recover_from_prehash(prehash, &normalized, recovery_id)
        .map_err(|_| SignatureError::Mismatch)?;
    if &recovered != key {
        return Err(SignatureError::Mismatch);
    }
    Ok((normalized, parity == 1))
}

/// Look up the signature for `hash` in the map.
pub fn lookup<'a>(signatures: &'a SignatureMap, hash: &str) -> Option<&'a KeysignSignature> {
    signatures
        .get(hash)
        .or_else(|| signatures.get(&format!("0x{hash}")))
}
