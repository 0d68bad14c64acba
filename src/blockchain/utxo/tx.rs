// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unsigned transaction construction on top of `bitcoin`'s consensus types.

use std::str::FromStr;

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::transaction::Version;
use bitcoin::{OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid txid {txid}: {reason}")]
pub struct InvalidTxid {
    pub txid: String,
    pub reason: String,
}

/// Outpoint from the txid as displayed by explorers.
pub fn outpoint(txid: &str, vout: u32) -> Result<OutPoint, InvalidTxid> {
    let txid_hex = txid.trim().trim_start_matches("0x");
    let txid = Txid::from_str(txid_hex).map_err(|e| InvalidTxid {
        txid: txid.to_string(),
        reason: e.to_string(),
    })?;
    Ok(OutPoint::new(txid, vout))
}

/// Input with an empty scriptSig and witness, final sequence.
pub fn unsigned_input(previous_output: OutPoint) -> TxIn {
    TxIn {
        previous_output,
        script_sig: ScriptBuf::new(),
        sequence: Sequence::MAX,
        witness: Witness::new(),
    }
}

/// Version 1, lock time 0.
pub fn unsigned_transaction(input: Vec<TxIn>, output: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input,
        output,
    }
}

/// Network serialization; segwit layout when any input carries a witness.
pub fn serialize(tx: &Transaction) -> Vec<u8> {
    encode::serialize(tx)
}
