// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session and the QR-shareable session descriptor.
//!
//! The initiating device creates a [`Session`] and shares a
//! [`SessionDescriptor`] (as raw JSON bytes or as a deep link) with the
//! other devices. The descriptor carries everything a joiner needs to reach
//! the mediator and decrypt relay traffic.

use alloy::hex;
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::crypto::{generate_session_key, CryptoError, SessionCipher};
use crate::blockchain::payload::KeysignPayload;
use crate::config::CoordinatorConfig;

/// Base of deep links rendered into QR codes.
pub const DEEP_LINK_BASE: &str = "relational://tss";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Malformed session descriptor: {0}")]
    Malformed(String),

    #[error("Invalid descriptor field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid deep link: {0}")]
    InvalidDeepLink(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> DescriptorError {
    DescriptorError::InvalidField {
        field,
        reason: reason.into(),
    }
}

/// One ceremony's relay coordinates and shared key. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub relay_url: String,
    pub encryption_key_hex: String,
    pub service_name: String,
}

impl Session {
    /// Create a fresh session with a random id and encryption key.
    pub fn new(relay_url: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            relay_url: relay_url.into(),
            encryption_key_hex: generate_session_key(),
            service_name: service_name.into(),
        }
    }

    /// Fresh session on the configured mediator, advertised under the
    /// configured service name.
    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.mediator_url.clone(), config.service_name.clone())
    }

    pub fn cipher(&self) -> Result<SessionCipher, CryptoError> {
        SessionCipher::from_hex_key(&self.encryption_key_hex)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if self.session_id.trim().is_empty() {
            return Err(invalid("session_id", "empty"));
        }

        let url = Url::parse(&self.relay_url).map_err(|e| invalid("relay_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("relay_url", format!("unsupported scheme {}", url.scheme())));
        }

        expect_hex_len("encryption_key_hex", &self.encryption_key_hex, 32)
    }
}

fn expect_hex_len(field: &'static str, value: &str, len: usize) -> Result<(), DescriptorError> {
    let bytes = hex::decode(value).map_err(|e| invalid(field, e.to_string()))?;
    if bytes.len() != len {
        return Err(invalid(field, format!("expected {len} bytes, got {}", bytes.len())));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeygenDescriptor {
    pub session: Session,
    pub vault_name: String,
    pub hex_chain_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReshareDescriptor {
    pub session: Session,
    pub vault_name: String,
    pub hex_chain_code: String,
    pub public_key_ecdsa: String,
    /// Committee that holds the current shares.
    pub old_parties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignDescriptor {
    pub session: Session,
    pub vault_public_key_ecdsa: String,
    pub payload: KeysignPayload,
}

/// Everything a joining device needs for one ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionDescriptor {
    Keygen(KeygenDescriptor),
    Reshare(ReshareDescriptor),
    Keysign(KeysignDescriptor),
}

impl SessionDescriptor {
    pub fn session(&self) -> &Session {
        match self {
            Self::Keygen(d) => &d.session,
            Self::Reshare(d) => &d.session,
            Self::Keysign(d) => &d.session,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Keygen(_) => "keygen",
            Self::Reshare(_) => "reshare",
            Self::Keysign(_) => "keysign",
        }
    }

    /// Serialize to transport-agnostic bytes.
    pub fn encode(&self) -> Result<Vec<u8>, DescriptorError> {
        self.validate()?;
        serde_json::to_vec(self).map_err(|e| DescriptorError::Malformed(e.to_string()))
    }

    /// Parse and validate descriptor bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let descriptor: Self =
            serde_json::from_slice(bytes).map_err(|e| DescriptorError::Malformed(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Render as a deep link suitable for a QR code.
    pub fn to_deep_link(&self) -> Result<String, DescriptorError> {
        let data = Base64UrlUnpadded::encode_string(&self.encode()?);
        let url = Url::parse_with_params(DEEP_LINK_BASE, &[("type", self.kind()), ("data", &data)])
            .map_err(|e| DescriptorError::InvalidDeepLink(e.to_string()))?;
        Ok(url.to_string())
    }

    /// Parse a deep link produced by [`SessionDescriptor::to_deep_link`].
    pub fn from_deep_link(link: &str) -> Result<Self, DescriptorError> {
        let url = Url::parse(link.trim()).map_err(|e| DescriptorError::InvalidDeepLink(e.to_string()))?;
        let base = Url::parse(DEEP_LINK_BASE).map_err(|e| DescriptorError::InvalidDeepLink(e.to_string()))?;
        if url.scheme() != base.scheme() || url.host_str() != base.host_str() {
            return Err(DescriptorError::InvalidDeepLink(format!("unexpected link {link}")));
        }

        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
                .ok_or_else(|| DescriptorError::InvalidDeepLink(format!("missing `{name}`")))
        };
        let kind = param("type")?;
        let data = param("data")?;

        let bytes = Base64UrlUnpadded::decode_vec(&data)
            .map_err(|e| DescriptorError::InvalidDeepLink(e.to_string()))?;
        let descriptor = Self::decode(&bytes)?;
        if descriptor.kind() != kind {
            return Err(DescriptorError::InvalidDeepLink(format!(
                "link type `{kind}` does not match `{}` descriptor",
                descriptor.kind()
            )));
        }
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        self.session().validate()?;

        match self {
            Self::Keygen(d) => expect_hex_len("hex_chain_code", &d.hex_chain_code, 32),
            Self::Reshare(d) => {
                expect_hex_len("hex_chain_code", &d.hex_chain_code, 32)?;
                expect_hex_len("public_key_ecdsa", &d.public_key_ecdsa, 33)?;
                if d.old_parties.is_empty() {
                    return Err(invalid("old_parties", "empty"));
                }
                let mut seen = std::collections::HashSet::new();
                if !d.old_parties.iter().all(|p| seen.insert(p)) {
                    return Err(invalid("old_parties", "duplicate party"));
                }
                Ok(())
            }
            Self::Keysign(d) => {
                expect_hex_len("vault_public_key_ecdsa", &d.vault_public_key_ecdsa, 33)
            }
        }
    }
}
