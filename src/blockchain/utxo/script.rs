// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Output and unlocking scripts.

use bitcoin::hashes::Hash;
use bitcoin::opcodes::all::OP_PUSHNUM_1;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::{PubkeyHash, ScriptBuf, ScriptHash, WPubkeyHash, WScriptHash};

/// Largest OP_RETURN payload relayed by standard nodes.
pub const MAX_OP_RETURN_LEN: usize = 80;

/// Decoded destination of an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    P2pkh([u8; 20]),
    P2sh([u8; 20]),
    P2wpkh([u8; 20]),
    P2wsh([u8; 32]),
    P2tr([u8; 32]),
}

impl Destination {
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self {
            Self::P2pkh(hash) => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(*hash)),
            Self::P2sh(hash) => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(*hash)),
            Self::P2wpkh(hash) => ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(*hash)),
            Self::P2wsh(hash) => ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(*hash)),
            Self::P2tr(key) => Builder::new()
                .push_opcode(OP_PUSHNUM_1)
                .push_slice(key)
                .into_script(),
        }
    }
}

/// `OP_RETURN <memo>`; `None` when the memo is too long to relay.
pub fn op_return(memo: &[u8]) -> Option<ScriptBuf> {
    if memo.len() > MAX_OP_RETURN_LEN {
        return None;
    }
    let data = PushBytesBuf::try_from(memo.to_vec()).ok()?;
    Some(ScriptBuf::new_op_return(data))
}

/// `<sig> <pubkey>` unlocking script for P2PKH. `None` if either push is
/// too large for a script.
pub fn p2pkh_script_sig(signature: &[u8], public_key: &[u8]) -> Option<ScriptBuf> {
    let signature = PushBytesBuf::try_from(signature.to_vec()).ok()?;
    let public_key = PushBytesBuf::try_from(public_key.to_vec()).ok()?;
    Some(
        Builder::new()
            .push_slice(signature)
            .push_slice(public_key)
            .into_script(),
    )
}

#[cfg(test)]
mod tests {
    use alloy::hex;

    use super::*;

    #[test]
    fn p2pkh_layout() {
        let script = Destination::P2pkh([0x11; 20]).script_pubkey();
        assert_eq!(
            hex::encode(script.as_bytes()),
            "76a914111111111111111111111111111111111111111188ac"
        );
    }

    #[test]
    fn segwit_programs() {
        assert_eq!(
            hex::encode(Destination::P2wpkh([0x22; 20]).script_pubkey().as_bytes()),
            format!("0014{}", "22".repeat(20))
        );
        assert_eq!(
            hex::encode(Destination::P2tr([0x33; 32]).script_pubkey().as_bytes()),
            format!("5120{}", "33".repeat(32))
        );
        assert_eq!(
            hex::encode(Destination::P2sh([0x44; 20]).script_pubkey().as_bytes()),
            format!("a914{}87", "44".repeat(20))
        );
    }

    #[test]
    fn op_return_memo() {
        assert_eq!(
            hex::encode(op_return(b"voltix").unwrap().as_bytes()),
            "6a06766f6c746978"
        );

        let script = op_return(&[b'a'; 80]).unwrap();
        assert_eq!(&script.as_bytes()[..3], &[0x6a, 0x4c, 80]);
        assert!(op_return(&[b'a'; 81]).is_none());
    }

    #[test]
    fn script_sig_pushes_signature_then_key() {
        let script = p2pkh_script_sig(&[0x30; 72], &[0x02; 33]).unwrap();
        let bytes = script.as_bytes();
        assert_eq!(bytes[0], 72);
        assert_eq!(bytes[73], 33);
        assert_eq!(bytes.len(), 1 + 72 + 1 + 33);
    }
}
