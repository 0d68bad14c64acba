// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solana helper: native SOL transfers in the legacy message format.
//!
//! The signable unit is the serialized message itself; its hex encoding is
//! what the engine signs.

use alloy::hex;
use ed25519_dalek::{Signature, VerifyingKey};
use tracing::debug;

use super::signature::{lookup, SignatureMap};
use super::{AssemblyError, BlockChainSpecific, Chain, ChainFamily, ChainHelper, KeysignPayload, SignedTransaction};

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

const SYSTEM_TRANSFER: u32 = 2;

fn write_compact_u16(out: &mut Vec<u8>, mut value: usize) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn decode_key(chain: Chain, field: &str, value: &str) -> Result<[u8; 32], AssemblyError> {
    bs58::decode(value.trim())
        .into_vec()
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .ok_or_else(|| AssemblyError::payload(chain, format!("{field} is not a 32-byte base58 key")))
}

struct Instruction {
    program: [u8; 32],
    accounts: Vec<u8>,
    data: Vec<u8>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SolanaHelper;

impl SolanaHelper {
    /// Serialized legacy message and the sender key.
    fn message(&self, payload: &KeysignPayload) -> Result<(Vec<u8>, [u8; 32]), AssemblyError> {
        let chain = payload.coin.chain;
        if chain != Chain::Solana {
            return Err(AssemblyError::UnsupportedChain(chain));
        }
        let BlockChainSpecific::Solana { recent_block_hash } = &payload.chain_specific else {
            return Err(AssemblyError::payload(chain, "expected a recent blockhash"));
        };
        if !payload.coin.is_native_token || payload.coin.contract_address.is_some() {
            return Err(AssemblyError::payload(chain, "only native SOL transfers are supported"));
        }

        let from = decode_key(chain, "coin address", &payload.coin.address)?;
        let to = bs58::decode(payload.to_address.trim())
            .into_vec()
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(|| AssemblyError::InvalidAddress {
                chain,
                address: payload.to_address.clone(),
            })?;
        let blockhash = decode_key(chain, "recent blockhash", recent_block_hash)?;
        let lamports = u64::try_from(payload.to_amount)
            .map_err(|_| AssemblyError::payload(chain, "amount exceeds 64 bits"))?;

        let mut writable = vec![from];
        if to != from {
            writable.push(to);
        }
        let to_index = writable.iter().position(|key| *key == to).unwrap_or(0) as u8;

        let mut instructions = Vec::with_capacity(2);
        if let Some(memo) = payload.memo_bytes() {
            instructions.push(Instruction {
                program: decode_key(chain, "memo program", MEMO_PROGRAM_ID)?,
                accounts: Vec::new(),
                data: memo.to_vec(),
            });
        }
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
        data.extend_from_slice(&lamports.to_le_bytes());
        instructions.push(Instruction {
            program: decode_key(chain, "system program", SYSTEM_PROGRAM_ID)?,
            accounts: vec![0, to_index],
            data,
        });

        let programs: Vec<[u8; 32]> = instructions.iter().map(|ix| ix.program).collect();
        let mut keys = writable;
        keys.extend_from_slice(&programs);

        let mut message = Vec::with_capacity(3 + 32 * (keys.len() + 1) + 64);
        // one signer, no read-only signers, every program read-only
        message.extend_from_slice(&[1, 0, programs.len() as u8]);
        write_compact_u16(&mut message, keys.len());
        for key in &keys {
            message.extend_from_slice(key);
        }
        message.extend_from_slice(&blockhash);

        write_compact_u16(&mut message, instructions.len());
        for instruction in &instructions {
            let program_index = keys
                .iter()
                .rposition(|key| *key == instruction.program)
                .unwrap_or(0) as u8;
            message.push(program_index);
            write_compact_u16(&mut message, instruction.accounts.len());
            message.extend_from_slice(&instruction.accounts);
            write_compact_u16(&mut message, instruction.data.len());
            message.extend_from_slice(&instruction.data);
        }

        Ok((message, from))
    }
}

impl ChainHelper for SolanaHelper {
    fn family(&self) -> ChainFamily {
        ChainFamily::Solana
    }

    fn pre_signed_image_hashes(&self, payload: &KeysignPayload) -> Result<Vec<String>, AssemblyError> {
        let (message, _) = self.message(payload)?;
        Ok(vec![hex::encode(message)])
    }

    fn assemble(
        &self,
        payload: &KeysignPayload,
        signatures: &SignatureMap,
    ) -> Result<SignedTransaction, AssemblyError> {
        let chain = payload.coin.chain;
        let (message, from) = self.message(payload)?;
        let hash = hex::encode(&message);

        let public_key = hex::decode(payload.coin.hex_public_key.trim_start_matches("0x"))
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(|| AssemblyError::payload(chain, "coin public key is not 32 bytes of hex"))?;
        if public_key != from {
            return Err(AssemblyError::payload(chain, "coin public key does not match its address"));
        }
        let key = VerifyingKey::from_bytes(&public_key)
            .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;

        let partial = lookup(signatures, &hash).ok_or_else(|| AssemblyError::MissingSignature {
            chain,
            hash: hash.clone(),
        })?;
        let bytes = partial
            .ed25519()
            .map_err(|e| AssemblyError::signature(chain, &hash, e))?;
        key.verify_strict(&message, &Signature::from_bytes(&bytes))
            .map_err(|e| AssemblyError::signature(chain, &hash, e))?;

        let mut wire = Vec::with_capacity(1 + 64 + message.len());
        write_compact_u16(&mut wire, 1);
        wire.extend_from_slice(&bytes);
        wire.extend_from_slice(&message);

        let transaction_hash = bs58::encode(bytes).into_string();
        debug!(chain = %chain, tx_hash = %transaction_hash, "Assembled Solana transfer");

        Ok(SignedTransaction {
            raw_transaction: bs58::encode(wire).into_string(),
            transaction_hash,
        })
    }
}
