// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM helper: EIP-1559 transactions for native transfers, ERC-20 transfers,
//! ERC-20 approvals and swap router calls.

use std::str::FromStr;

use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope},
    eips::eip2718::Encodable2718,
    hex,
    primitives::{Address, Bytes, Signature, TxKind, U256},
};
use tracing::debug;

use super::erc20;
use super::signature::{self, lookup, SignatureMap};
use super::{AssemblyError, BlockChainSpecific, Chain, ChainFamily, ChainHelper, KeysignPayload, SignedTransaction};

/// EIP-155 chain id.
pub fn chain_id(chain: Chain) -> Option<u64> {
    match chain {
        Chain::Ethereum => Some(1),
        Chain::Avalanche => Some(43114),
        Chain::BscChain => Some(56),
        Chain::Polygon => Some(137),
        Chain::Arbitrum => Some(42161),
        Chain::Optimism => Some(10),
        Chain::Base => Some(8453),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EvmHelper;

impl EvmHelper {
    fn unsigned(&self, payload: &KeysignPayload) -> Result<TxEip1559, AssemblyError> {
        let chain = payload.coin.chain;
        let chain_id = chain_id(chain).ok_or(AssemblyError::UnsupportedChain(chain))?;

        let BlockChainSpecific::Ethereum {
            max_fee_per_gas_wei,
            priority_fee_wei,
            nonce,
            gas_limit,
        } = payload.chain_specific
        else {
            return Err(AssemblyError::payload(chain, "expected EIP-1559 gas fields"));
        };

        let parse_address = |raw: &str| {
            Address::from_str(raw.trim()).map_err(|_| AssemblyError::InvalidAddress {
                chain,
                address: raw.to_string(),
            })
        };
        let token_contract = || {
            payload
                .coin
                .contract_address
                .as_deref()
                .ok_or_else(|| AssemblyError::payload(chain, "token has no contract address"))
                .and_then(parse_address)
        };

        let (to, value, input): (Address, U256, Bytes) = if let Some(approve) = &payload.approve_payload {
            let spender = parse_address(&approve.spender)?;
            (token_contract()?, U256::ZERO, erc20::approve_max_call(spender))
        } else if let Some(swap) = &payload.swap_payload {
            let data = hex::decode(swap.call_data_hex.trim().trim_start_matches("0x"))
                .map_err(|_| AssemblyError::payload(chain, "swap call data is not hex"))?;
            (
                parse_address(&swap.router_address)?,
                U256::from(swap.value),
                data.into(),
            )
        } else if !payload.coin.is_native_token {
            let recipient = parse_address(&payload.to_address)?;
            (
                token_contract()?,
                U256::ZERO,
                erc20::transfer_call(recipient, U256::from(payload.to_amount)),
            )
        } else {
            let memo = payload.memo_bytes().map(<[u8]>::to_vec).unwrap_or_default();
            (
                parse_address(&payload.to_address)?,
                U256::from(payload.to_amount),
                memo.into(),
            )
        };

        Ok(TxEip1559 {
            chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas: max_fee_per_gas_wei,
            max_priority_fee_per_gas: priority_fee_wei,
            to: TxKind::Call(to),
            value,
            access_list: Default::default(),
            input,
        })
    }
}

impl ChainHelper for EvmHelper {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn pre_signed_image_hashes(&self, payload: &KeysignPayload) -> Result<Vec<String>, AssemblyError> {
        let tx = self.unsigned(payload)?;
        Ok(vec![hex::encode(tx.signature_hash())])
    }

    fn assemble(
        &self,
        payload: &KeysignPayload,
        signatures: &SignatureMap,
    ) -> Result<SignedTransaction, AssemblyError> {
        let chain = payload.coin.chain;
        let tx = self.unsigned(payload)?;
        let hash = tx.signature_hash();
        let hash_hex = hex::encode(hash);

        let partial = lookup(signatures, &hash_hex).ok_or_else(|| AssemblyError::MissingSignature {
            chain,
            hash: hash_hex.clone(),
        })?;
        let key = signature::verifying_key(&payload.coin.hex_public_key)
            .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;
        let (ecdsa, y_parity) = signature::recoverable(partial, &key, &hash.0)
            .map_err(|e| AssemblyError::signature(chain, &hash_hex, e))?;

        let bytes = ecdsa.to_bytes();
        let signed = tx.into_signed(Signature::new(
            U256::from_be_slice(&bytes[..32]),
            U256::from_be_slice(&bytes[32..]),
            y_parity,
        ));
        let transaction_hash = format!("0x{}", hex::encode(signed.hash()));
        let raw = TxEnvelope::from(signed).encoded_2718();

        debug!(chain = %chain, tx_hash = %transaction_hash, "Assembled EIP-1559 transaction");

        Ok(SignedTransaction {
            raw_transaction: format!("0x{}", hex::encode(raw)),
            transaction_hash,
        })
    }
}
