// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain → helper dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use super::cosmos::CosmosHelper;
use super::evm::EvmHelper;
use super::solana::SolanaHelper;
use super::utxo::UtxoHelper;
use super::{AssemblyError, Chain, ChainFamily, ChainHelper, KeysignPayload, SignatureMap, SignedTransaction};

/// One helper per chain family.
#[derive(Clone)]
pub struct HelperRegistry {
    helpers: HashMap<ChainFamily, Arc<dyn ChainHelper>>,
}

impl HelperRegistry {
    pub fn empty() -> Self {
        Self {
            helpers: HashMap::new(),
        }
    }

    /// Registry with every built-in helper.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(UtxoHelper));
        registry.register(Arc::new(EvmHelper));
        registry.register(Arc::new(SolanaHelper));
        registry.register(Arc::new(CosmosHelper));
        registry
    }

    /// Install `helper` for its family, replacing any previous one.
    pub fn register(&mut self, helper: Arc<dyn ChainHelper>) {
        self.helpers.insert(helper.family(), helper);
    }

    pub fn helper_for(&self, chain: Chain) -> Result<&dyn ChainHelper, AssemblyError> {
        chain
            .family()
            .and_then(|family| self.helpers.get(&family))
            .map(|helper| helper.as_ref())
            .ok_or(AssemblyError::UnsupportedChain(chain))
    }

    pub fn pre_signed_image_hashes(&self, payload: &KeysignPayload) -> Result<Vec<String>, AssemblyError> {
        self.helper_for(payload.coin.chain)?
            .pre_signed_image_hashes(payload)
    }

    pub fn assemble(
        &self,
        payload: &KeysignPayload,
        signatures: &SignatureMap,
    ) -> Result<SignedTransaction, AssemblyError> {
        self.helper_for(payload.coin.chain)?
            .assemble(payload, signatures)
    }
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::payload::tests::{bch_payload, eth_payload, thor_payload, UTXO_PUBLIC_KEY};

    #[test]
    fn every_chain_with_a_family_has_a_helper() {
        let registry = HelperRegistry::standard();
        for chain in Chain::ALL {
            match chain.family() {
                Some(family) => assert_eq!(registry.helper_for(*chain).unwrap().family(), family),
                None => assert_eq!(
                    registry.helper_for(*chain).err(),
                    Some(AssemblyError::UnsupportedChain(*chain))
                ),
            }
        }
    }

    #[test]
    fn dispatches_by_coin_chain() {
        let registry = HelperRegistry::standard();
        assert_eq!(
            registry.pre_signed_image_hashes(&bch_payload()).unwrap(),
            vec!["195b256774ca393f2e9812478abf6958076d0ff7d427dc958d35a9f7ffe7439b".to_string()]
        );
        assert_eq!(
            registry.pre_signed_image_hashes(&eth_payload(UTXO_PUBLIC_KEY)).unwrap().len(),
            1
        );
        assert_eq!(
            registry.pre_signed_image_hashes(&thor_payload()).unwrap(),
            vec!["78b96e91652182d87395b12ebcf86a1883d434f1b531bfb26a386e1610bbb505".to_string()]
        );
    }

    #[test]
    fn unknown_chain_is_never_defaulted() {
        let mut payload = bch_payload();
        payload.coin.chain = Chain::Sui;
        assert_eq!(
            HelperRegistry::standard().pre_signed_image_hashes(&payload),
            Err(AssemblyError::UnsupportedChain(Chain::Sui))
        );

        let payload = bch_payload();
        assert_eq!(
            HelperRegistry::empty().assemble(&payload, &SignatureMap::new()),
            Err(AssemblyError::UnsupportedChain(Chain::BitcoinCash))
        );
    }
}
