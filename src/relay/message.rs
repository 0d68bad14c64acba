// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire format of relayed protocol messages.

use serde::{Deserialize, Serialize};

/// One encrypted TSS protocol message as stored by the mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMessage {
    pub session_id: String,
    pub from: String,
    pub to: Vec<String>,
    /// `base64(nonce || ciphertext || tag)`
    pub body: String,
    /// Hex SHA-256 of the plaintext body.
    pub hash: String,
    #[serde(default)]
    pub sequence_no: u64,
}

impl ProtocolMessage {
    /// Dedup cache key for this message as seen by `party_id`.
    ///
    /// The optional scope isolates ceremonies running side by side in one
    /// session (e.g. ECDSA and EdDSA keygen).
    pub fn cache_key(&self, session_id: &str, party_id: &str, scope: Option<&str>) -> String {
        match scope {
            Some(scope) => format!("{session_id}-{party_id}-{scope}-{}", self.hash),
            None => format!("{session_id}-{party_id}-{}", self.hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> ProtocolMessage {
        ProtocolMessage {
            session_id: "s1".to_string(),
            from: "iphone-A1".to_string(),
            to: vec!["mac-B2".to_string()],
            body: "Ym9keQ==".to_string(),
            hash: "abcd".to_string(),
            sequence_no: 3,
        }
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let json = serde_json::to_value(message()).unwrap();
        assert_eq!(json["sequence_no"], 3);
        assert_eq!(json["to"][0], "mac-B2");
    }

    #[test]
    fn missing_sequence_defaults_to_zero() {
        let raw = r#"{"session_id":"s1","from":"a","to":["b"],"body":"","hash":"h"}"#;
        let parsed: ProtocolMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.sequence_no, 0);
    }

    #[test]
    fn cache_key_includes_scope_when_present() {
        let msg = message();
        assert_eq!(msg.cache_key("s1", "mac-B2", None), "s1-mac-B2-abcd");
        assert_eq!(
            msg.cache_key("s1", "mac-B2", Some("eddsa")),
            "s1-mac-B2-eddsa-abcd"
        );
    }
}
