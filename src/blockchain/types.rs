// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain identifiers and the chain → family table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every chain a keysign payload can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Bitcoin,
    BitcoinCash,
    Litecoin,
    Dogecoin,
    Dash,
    Ethereum,
    Avalanche,
    BscChain,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Solana,
    ThorChain,
    MayaChain,
    Gaia,
    Sui,
    Polkadot,
}

/// Transaction model shared by a group of chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Utxo,
    Evm,
    Solana,
    Cosmos,
}

impl Chain {
    pub const ALL: &'static [Chain] = &[
        Chain::Bitcoin,
        Chain::BitcoinCash,
        Chain::Litecoin,
        Chain::Dogecoin,
        Chain::Dash,
        Chain::Ethereum,
        Chain::Avalanche,
        Chain::BscChain,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Base,
        Chain::Solana,
        Chain::ThorChain,
        Chain::MayaChain,
        Chain::Gaia,
        Chain::Sui,
        Chain::Polkadot,
    ];

    /// Family whose helper signs for this chain, or `None` when no helper
    /// exists. Never falls back to another family.
    pub fn family(self) -> Option<ChainFamily> {
        match self {
            Chain::Bitcoin
            | Chain::BitcoinCash
            | Chain::Litecoin
            | Chain::Dogecoin
            | Chain::Dash => Some(ChainFamily::Utxo),
            Chain::Ethereum
            | Chain::Avalanche
            | Chain::BscChain
            | Chain::Polygon
            | Chain::Arbitrum
            | Chain::Optimism
            | Chain::Base => Some(ChainFamily::Evm),
            Chain::Solana => Some(ChainFamily::Solana),
            Chain::ThorChain | Chain::MayaChain | Chain::Gaia => Some(ChainFamily::Cosmos),
            Chain::Sui | Chain::Polkadot => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Chain::Bitcoin => "Bitcoin",
            Chain::BitcoinCash => "Bitcoin Cash",
            Chain::Litecoin => "Litecoin",
            Chain::Dogecoin => "Dogecoin",
            Chain::Dash => "Dash",
            Chain::Ethereum => "Ethereum",
            Chain::Avalanche => "Avalanche",
            Chain::BscChain => "BSC",
            Chain::Polygon => "Polygon",
            Chain::Arbitrum => "Arbitrum",
            Chain::Optimism => "Optimism",
            Chain::Base => "Base",
            Chain::Solana => "Solana",
            Chain::ThorChain => "THORChain",
            Chain::MayaChain => "MayaChain",
            Chain::Gaia => "Cosmos",
            Chain::Sui => "Sui",
            Chain::Polkadot => "Polkadot",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_chains_have_no_family() {
        for chain in [Chain::Sui, Chain::Polkadot] {
            assert_eq!(chain.family(), None, "{chain}");
        }
        for chain in [Chain::ThorChain, Chain::MayaChain, Chain::Gaia] {
            assert_eq!(chain.family(), Some(ChainFamily::Cosmos), "{chain}");
        }
        assert_eq!(Chain::BitcoinCash.family(), Some(ChainFamily::Utxo));
        assert_eq!(Chain::Base.family(), Some(ChainFamily::Evm));
        assert_eq!(Chain::Solana.family(), Some(ChainFamily::Solana));
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&Chain::BitcoinCash).unwrap(),
            "\"bitcoin_cash\""
        );
        assert_eq!(
            serde_json::from_str::<Chain>("\"bsc_chain\"").unwrap(),
            Chain::BscChain
        );
    }
}
