// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-chain parameters for the Bitcoin-family helpers.

use crate::blockchain::types::Chain;

/// SIGHASH_ALL
pub const SIGHASH_ALL: u32 = 0x01;

/// SIGHASH_ALL | SIGHASH_FORKID (Bitcoin Cash replay protection).
pub const SIGHASH_ALL_FORKID: u32 = 0x41;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoChainParams {
    pub chain: Chain,
    /// Base58 version byte of P2PKH addresses.
    pub p2pkh_version: u8,
    /// Accepted base58 version bytes of P2SH addresses.
    pub p2sh_versions: &'static [u8],
    /// Segwit human-readable part, when the chain has segwit.
    pub bech32_hrp: Option<&'static str>,
    /// CashAddr prefix, when the chain uses CashAddr.
    pub cashaddr_prefix: Option<&'static str>,
    /// Sign every input with BIP143 + SIGHASH_FORKID.
    pub fork_id: bool,
    /// Outputs below this many base units are not created.
    pub dust_threshold: u64,
}

pub const BITCOIN: UtxoChainParams = UtxoChainParams {
    chain: Chain::Bitcoin,
    p2pkh_version: 0x00,
    p2sh_versions: &[0x05],
    bech32_hrp: Some("bc"),
    cashaddr_prefix: None,
    fork_id: false,
    dust_threshold: 546,
};

pub const LITECOIN: UtxoChainParams = UtxoChainParams {
    chain: Chain::Litecoin,
    p2pkh_version: 0x30,
    p2sh_versions: &[0x32, 0x05],
    bech32_hrp: Some("ltc"),
    cashaddr_prefix: None,
    fork_id: false,
    dust_threshold: 1000,
};

pub const BITCOIN_CASH: UtxoChainParams = UtxoChainParams {
    chain: Chain::BitcoinCash,
    p2pkh_version: 0x00,
    p2sh_versions: &[0x05],
    bech32_hrp: None,
    cashaddr_prefix: Some("bitcoincash"),
    fork_id: true,
    dust_threshold: 546,
};

pub const DOGECOIN: UtxoChainParams = UtxoChainParams {
    chain: Chain::Dogecoin,
    p2pkh_version: 0x1e,
    p2sh_versions: &[0x16],
    bech32_hrp: None,
    cashaddr_prefix: None,
    fork_id: false,
    dust_threshold: 1_000_000,
};

pub const DASH: UtxoChainParams = UtxoChainParams {
    chain: Chain::Dash,
    p2pkh_version: 0x4c,
    p2sh_versions: &[0x10],
    bech32_hrp: None,
    cashaddr_prefix: None,
    fork_id: false,
    dust_threshold: 546,
};

const ALL: &[UtxoChainParams] = &[BITCOIN, LITECOIN, BITCOIN_CASH, DOGECOIN, DASH];

impl UtxoChainParams {
    pub fn for_chain(chain: Chain) -> Option<&'static UtxoChainParams> {
        ALL.iter().find(|params| params.chain == chain)
    }
}
