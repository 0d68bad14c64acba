// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-chain pre-signature hashing and signed-transaction assembly.
//!
//! This module provides:
//! - The keysign payload and the engine's signature map
//! - One [`ChainHelper`] per chain family (UTXO, EVM, Solana, Cosmos SDK)
//! - A static chain → helper registry
//!
//! Helpers are pure: the same payload always yields the same hashes, and the
//! same (payload, signatures) pair always yields byte-identical output.

pub mod cosmos;
pub mod erc20;
pub mod evm;
pub mod payload;
pub mod registry;
pub mod signature;
pub mod solana;
pub mod types;
pub mod utxo;

pub use payload::{ApprovePayload, BlockChainSpecific, Coin, KeysignPayload, SwapPayload, UtxoInfo};
pub use registry::HelperRegistry;
pub use signature::{KeysignSignature, SignatureMap};
pub use types::{Chain, ChainFamily};

use serde::{Deserialize, Serialize};

/// Fatal errors while deriving hashes or assembling a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("no signing helper for chain {0}")]
    UnsupportedChain(Chain),

    #[error("{chain}: no signature for hash {hash}")]
    MissingSignature { chain: Chain, hash: String },

    #[error("{chain}: invalid signature for hash {hash}: {reason}")]
    InvalidSignature {
        chain: Chain,
        hash: String,
        reason: String,
    },

    #[error("{chain}: expected {expected} signatures, got {actual}")]
    SignatureCount {
        chain: Chain,
        expected: usize,
        actual: usize,
    },

    #[error("{chain}: invalid payload: {reason}")]
    InvalidPayload { chain: Chain, reason: String },

    #[error("{chain}: invalid address {address}")]
    InvalidAddress { chain: Chain, address: String },

    #[error("{chain}: insufficient funds, need {needed} have {available}")]
    InsufficientFunds {
        chain: Chain,
        needed: u128,
        available: u128,
    },
}

impl AssemblyError {
    pub(crate) fn payload(chain: Chain, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            chain,
            reason: reason.into(),
        }
    }

    pub(crate) fn signature(chain: Chain, hash: &str, reason: impl ToString) -> Self {
        Self::InvalidSignature {
            chain,
            hash: hash.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Ready-to-broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub raw_transaction: String,
    pub transaction_hash: String,
}

/// Hashing and assembly for one chain family.
pub trait ChainHelper: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Hex hashes to sign, in signing order.
    fn pre_signed_image_hashes(&self, payload: &KeysignPayload) -> Result<Vec<String>, AssemblyError>;

    /// Attach `signatures` and serialize the final transaction.
    fn assemble(
        &self,
        payload: &KeysignPayload,
        signatures: &SignatureMap,
    ) -> Result<SignedTransaction, AssemblyError>;
}
