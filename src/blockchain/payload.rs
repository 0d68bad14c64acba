// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keysign payload: everything needed to build one unsigned transaction.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::types::Chain;

/// `u128` amounts travel as decimal strings so they survive JSON readers
/// limited to 53-bit integers. Plain integers are still accepted.
type Decimal = PickFirst<(DisplayFromStr, serde_with::Same)>;

/// The asset being moved and the wallet key that controls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub chain: Chain,
    pub ticker: String,
    /// Sender address on `chain`.
    pub address: String,
    /// Compressed secp256k1 key (33 bytes) or ed25519 key (32 bytes), hex.
    pub hex_public_key: String,
    /// Token contract, `None` for the native asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    pub decimals: u8,
    pub is_native_token: bool,
}

/// Chain-family specific fee and replay fields, taken verbatim.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockChainSpecific {
    Utxo {
        /// Fee rate in base units per (virtual) byte.
        byte_fee: u64,
        /// Spend every input to the destination, no change output.
        #[serde(default)]
        send_max_amount: bool,
    },
    Ethereum {
        #[serde_as(as = "Decimal")]
        max_fee_per_gas_wei: u128,
        #[serde_as(as = "Decimal")]
        priority_fee_wei: u128,
        nonce: u64,
        gas_limit: u64,
    },
    Solana {
        /// Base58 recent blockhash.
        recent_block_hash: String,
    },
    /// Cosmos SDK chains (THORChain, MayaChain, Cosmos Hub).
    Cosmos {
        account_number: u64,
        sequence: u64,
        /// Fee in the chain's fee denom. Ignored where the fee is fixed.
        #[serde(default)]
        gas: u64,
    },
}

/// One spendable output owned by the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInfo {
    /// Funding txid as shown by explorers.
    pub hash: String,
    pub amount: u64,
    pub index: u32,
}

/// Contract call produced by a swap quote.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPayload {
    pub router_address: String,
    #[serde_as(as = "Decimal")]
    pub value: u128,
    pub call_data_hex: String,
}

/// ERC-20 allowance grant. The requested amount is informational; the
/// transaction always approves the maximum.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovePayload {
    pub spender: String,
    #[serde_as(as = "Decimal")]
    pub amount: u128,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysignPayload {
    pub coin: Coin,
    pub to_address: String,
    /// Amount in the coin's base units.
    #[serde_as(as = "Decimal")]
    pub to_amount: u128,
    pub chain_specific: BlockChainSpecific,
    #[serde(default)]
    pub utxos: Vec<UtxoInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_payload: Option<SwapPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approve_payload: Option<ApprovePayload>,
    pub vault_public_key_ecdsa: String,
    pub vault_local_party_id: String,
}

impl KeysignPayload {
    /// Memo bytes, `None` when absent or empty.
    pub fn memo_bytes(&self) -> Option<&[u8]> {
        self.memo
            .as_deref()
            .filter(|memo| !memo.is_empty())
            .map(str::as_bytes)
    }
}
