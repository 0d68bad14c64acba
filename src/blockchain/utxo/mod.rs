// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bitcoin-family helper: Bitcoin, Litecoin, Bitcoin Cash, Dogecoin, Dash.
//!
//! Inputs are spent in payload order. Outputs are the destination, the change
//! back to the sender (dropped when below the dust threshold) and an optional
//! OP_RETURN memo. One sighash per input; P2WPKH senders get BIP143 and a
//! witness, Bitcoin Cash gets BIP143 with SIGHASH_FORKID, everything else the
//! legacy algorithm.

pub mod address;
pub mod fee;
pub mod params;
pub mod script;
pub mod sighash;
pub mod tx;

use alloy::hex;
use bitcoin::sighash::SighashCache;
use bitcoin::{Amount, Transaction, TxOut, Witness};
use tracing::debug;

use self::fee::InputKind;
use self::params::{UtxoChainParams, SIGHASH_ALL, SIGHASH_ALL_FORKID};
use self::script::Destination;
use super::signature::{self, lookup, SignatureMap};
use super::{
    AssemblyError, BlockChainSpecific, ChainFamily, ChainHelper, KeysignPayload, SignedTransaction,
};

/// Unsigned transaction plus what is needed to sign each input.
struct UtxoPlan {
    kind: InputKind,
    sighash_type: u32,
    tx: Transaction,
    hashes: Vec<[u8; 32]>,
}

fn output(value: u64, destination: &Destination) -> TxOut {
    TxOut {
        value: Amount::from_sat(value),
        script_pubkey: destination.script_pubkey(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UtxoHelper;

impl UtxoHelper {
    fn plan(&self, payload: &KeysignPayload) -> Result<UtxoPlan, AssemblyError> {
        let chain = payload.coin.chain;
        let params =
            UtxoChainParams::for_chain(chain).ok_or(AssemblyError::UnsupportedChain(chain))?;

        let BlockChainSpecific::Utxo {
            byte_fee,
            send_max_amount,
        } = payload.chain_specific
        else {
            return Err(AssemblyError::payload(chain, "expected UTXO fee fields"));
        };
        if payload.utxos.is_empty() {
            return Err(AssemblyError::payload(chain, "no inputs to spend"));
        }

        let invalid_address = |address: &str| AssemblyError::InvalidAddress {
            chain,
            address: address.to_string(),
        };
        let (kind, own) = match address::decode(params, &payload.coin.address) {
            Ok(own @ Destination::P2pkh(_)) => (InputKind::Legacy, own),
            Ok(own @ Destination::P2wpkh(_)) if !params.fork_id => (InputKind::Segwit, own),
            _ => return Err(invalid_address(&payload.coin.address)),
        };
        let destination = address::decode(params, &payload.to_address)
            .map_err(|_| invalid_address(&payload.to_address))?;

        let memo = match payload.memo_bytes() {
            Some(memo) => Some(
                script::op_return(memo)
                    .ok_or_else(|| AssemblyError::payload(chain, "memo longer than 80 bytes"))?,
            ),
            None => None,
        };

        let mut inputs = Vec::with_capacity(payload.utxos.len());
        let mut total: u64 = 0;
        for utxo in &payload.utxos {
            let outpoint = tx::outpoint(&utxo.hash, utxo.index)
                .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;
            inputs.push(tx::unsigned_input(outpoint));
            total = total
                .checked_add(utxo.amount)
                .ok_or_else(|| AssemblyError::payload(chain, "input total overflows"))?;
        }

        let memo_outputs = usize::from(memo.is_some());
        let mut outputs = Vec::with_capacity(3);
        let network_fee;
        if send_max_amount {
            network_fee = fee::estimate(kind, inputs.len(), 1 + memo_outputs, byte_fee);
            let amount = total
                .checked_sub(network_fee)
                .filter(|amount| *amount >= params.dust_threshold)
                .ok_or(AssemblyError::InsufficientFunds {
                    chain,
                    needed: u128::from(network_fee) + u128::from(params.dust_threshold),
                    available: u128::from(total),
                })?;
            outputs.push(output(amount, &destination));
        } else {
            let amount = u64::try_from(payload.to_amount)
                .map_err(|_| AssemblyError::payload(chain, "amount exceeds 64 bits"))?;
            if amount < params.dust_threshold {
                return Err(AssemblyError::payload(chain, "amount below dust threshold"));
            }

            network_fee = fee::estimate(kind, inputs.len(), 2 + memo_outputs, byte_fee);
            let needed = u128::from(amount) + u128::from(network_fee);
            if u128::from(total) < needed {
                return Err(AssemblyError::InsufficientFunds {
                    chain,
                    needed,
                    available: u128::from(total),
                });
            }
            outputs.push(output(amount, &destination));

            // Fee was estimated with the change output; it is not re-estimated
            // when the change is dropped.
            let change = total - amount - network_fee;
            if change >= params.dust_threshold {
                outputs.push(output(change, &own));
            }
        }
        if let Some(script_pubkey) = memo {
            outputs.push(TxOut {
                value: Amount::ZERO,
                script_pubkey,
            });
        }

        let tx = tx::unsigned_transaction(inputs, outputs);
        let own_script = own.script_pubkey();
        let sighash_type = if params.fork_id {
            SIGHASH_ALL_FORKID
        } else {
            SIGHASH_ALL
        };

        let mut cache = SighashCache::new(&tx);
        let mut hashes = Vec::with_capacity(payload.utxos.len());
        for (index, utxo) in payload.utxos.iter().enumerate() {
            let hash = match kind {
                InputKind::Segwit => sighash::p2wpkh(&mut cache, index, &own_script, utxo.amount),
                InputKind::Legacy if params.fork_id => {
                    sighash::forkid(&tx, index, &own_script, utxo.amount, sighash_type)
                }
                InputKind::Legacy => sighash::legacy(&tx, index, &own_script, sighash_type),
            }
            .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;
            hashes.push(hash);
        }

        debug!(
            chain = %chain,
            inputs = tx.input.len(),
            outputs = tx.output.len(),
            fee = network_fee,
            "Built unsigned UTXO transaction"
        );

        Ok(UtxoPlan {
            kind,
            sighash_type,
            tx,
            hashes,
        })
    }
}

impl ChainHelper for UtxoHelper {
    fn family(&self) -> ChainFamily {
        ChainFamily::Utxo
    }

    fn pre_signed_image_hashes(&self, payload: &KeysignPayload) -> Result<Vec<String>, AssemblyError> {
        let plan = self.plan(payload)?;
        Ok(plan.hashes.iter().map(hex::encode).collect())
    }

    fn assemble(
        &self,
        payload: &KeysignPayload,
        signatures: &SignatureMap,
    ) -> Result<SignedTransaction, AssemblyError> {
        let chain = payload.coin.chain;
        let UtxoPlan {
            kind,
            sighash_type,
            mut tx,
            hashes,
        } = self.plan(payload)?;

        let public_key = hex::decode(payload.coin.hex_public_key.trim_start_matches("0x"))
            .map_err(|_| AssemblyError::payload(chain, "coin public key is not hex"))?;
        let key = signature::verifying_key(&payload.coin.hex_public_key)
            .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;

        for (input, hash) in tx.input.iter_mut().zip(&hashes) {
            let hash_hex = hex::encode(hash);
            let partial = lookup(signatures, &hash_hex).ok_or_else(|| {
                AssemblyError::MissingSignature {
                    chain,
                    hash: hash_hex.clone(),
                }
            })?;

            let mut der = signature::verified_der(partial, &key, hash)
                .map_err(|e| AssemblyError::signature(chain, &hash_hex, e))?;
            der.push(sighash_type as u8);

            match kind {
                InputKind::Legacy => {
                    input.script_sig = script::p2pkh_script_sig(&der, &public_key)
                        .ok_or_else(|| AssemblyError::signature(chain, &hash_hex, "push too large"))?;
                }
                InputKind::Segwit => input.witness = Witness::from_slice(&[der, public_key.clone()]),
            }
        }
        if signatures.len() != hashes.len() {
            return Err(AssemblyError::SignatureCount {
                chain,
                expected: hashes.len(),
                actual: signatures.len(),
            });
        }

        Ok(SignedTransaction {
            raw_transaction: hex::encode(tx::serialize(&tx)),
            transaction_hash: tx.compute_txid().to_string(),
        })
    }
}
