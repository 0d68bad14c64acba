// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cosmos SDK helper: THORChain, MayaChain and the Cosmos Hub.
//!
//! One bank send per transaction, signed in SIGN_MODE_DIRECT. The signable
//! unit is `sha256(SignDoc)`; the engine's `r ‖ s` goes into a `TxRaw`.
//! THORChain and MayaChain use their own `MsgSend` with raw address bytes
//! and charge a fixed fee.

pub mod proto;

use alloy::hex;
use base64ct::{Base64, Encoding};
use bitcoin::hashes::{hash160, Hash};
use prost::Message;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use self::proto::{
    Any, AuthInfo, Coin, Fee, ModeInfo, ModeInfoSingle, MsgSend, PubKey, SignDoc, SignerInfo,
    ThorchainMsgSend, TxBody, TxRaw,
};
use super::signature::{self, lookup, SignatureMap};
use super::{
    AssemblyError, BlockChainSpecific, Chain, ChainFamily, ChainHelper, KeysignPayload,
    SignedTransaction,
};

/// Per-chain constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmosChainParams {
    pub chain_id: &'static str,
    pub hrp: &'static str,
    pub denom: &'static str,
    pub gas_limit: u64,
    /// Fee charged regardless of the payload's `gas`.
    pub fixed_fee: Option<u64>,
    /// `types.MsgSend` with raw address bytes instead of the bank module's.
    pub thorchain_send: bool,
}

const THORCHAIN: CosmosChainParams = CosmosChainParams {
    chain_id: "thorchain-1",
    hrp: "thor",
    denom: "rune",
    gas_limit: 20_000_000,
    fixed_fee: Some(2_000_000),
    thorchain_send: true,
};

const MAYACHAIN: CosmosChainParams = CosmosChainParams {
    chain_id: "mayachain-mainnet-v1",
    hrp: "maya",
    denom: "cacao",
    gas_limit: 2_000_000_000,
    fixed_fee: Some(2_000_000_000),
    thorchain_send: true,
};

const GAIA: CosmosChainParams = CosmosChainParams {
    chain_id: "cosmoshub-4",
    hrp: "cosmos",
    denom: "uatom",
    gas_limit: 200_000,
    fixed_fee: None,
    thorchain_send: false,
};

impl CosmosChainParams {
    pub fn for_chain(chain: Chain) -> Option<&'static CosmosChainParams> {
        match chain {
            Chain::ThorChain => Some(&THORCHAIN),
            Chain::MayaChain => Some(&MAYACHAIN),
            Chain::Gaia => Some(&GAIA),
            _ => None,
        }
    }
}

/// Bech32 account address for a compressed secp256k1 key.
pub fn account_address(hrp: &str, public_key: &[u8]) -> Result<String, bech32::EncodeError> {
    let hrp = bech32::Hrp::parse_unchecked(hrp);
    let account = hash160::Hash::hash(public_key).to_byte_array();
    bech32::encode::<bech32::Bech32>(hrp, &account)
}

fn decode_account(params: &CosmosChainParams, address: &str) -> Option<[u8; 20]> {
    let (hrp, data) = bech32::decode(address.trim()).ok()?;
    if hrp.as_str() != params.hrp {
        return None;
    }
    data.try_into().ok()
}

/// JSON body accepted by the `/cosmos/tx/v1beta1/txs` broadcast route.
#[derive(Serialize)]
struct BroadcastRequest<'a> {
    mode: &'a str,
    tx_bytes: String,
}

/// Encoded body and auth info plus the sign doc hash over them.
struct CosmosPlan {
    body_bytes: Vec<u8>,
    auth_info_bytes: Vec<u8>,
    sign_doc_hash: [u8; 32],
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CosmosHelper;

impl CosmosHelper {
    fn plan(&self, payload: &KeysignPayload) -> Result<CosmosPlan, AssemblyError> {
        let chain = payload.coin.chain;
        let params =
            CosmosChainParams::for_chain(chain).ok_or(AssemblyError::UnsupportedChain(chain))?;
        let BlockChainSpecific::Cosmos {
            account_number,
            sequence,
            gas,
        } = payload.chain_specific
        else {
            return Err(AssemblyError::payload(chain, "expected account number and sequence"));
        };

        let public_key = hex::decode(payload.coin.hex_public_key.trim_start_matches("0x"))
            .map_err(|_| AssemblyError::payload(chain, "coin public key is not hex"))?;
        if public_key.len() != 33 {
            return Err(AssemblyError::payload(chain, "coin public key must be compressed"));
        }

        let invalid_address = |address: &str| AssemblyError::InvalidAddress {
            chain,
            address: address.to_string(),
        };
        let from = decode_account(params, &payload.coin.address)
            .ok_or_else(|| invalid_address(&payload.coin.address))?;
        if from != hash160::Hash::hash(&public_key).to_byte_array() {
            return Err(AssemblyError::payload(chain, "coin address does not match public key"));
        }
        let to = decode_account(params, &payload.to_address)
            .ok_or_else(|| invalid_address(&payload.to_address))?;

        let denom = if payload.coin.is_native_token {
            params.denom.to_string()
        } else {
            payload
                .coin
                .contract_address
                .clone()
                .unwrap_or_else(|| payload.coin.ticker.to_lowercase())
        };
        let amount = vec![Coin {
            denom,
            amount: payload.to_amount.to_string(),
        }];
        let message = if params.thorchain_send {
            Any::pack(
                proto::THORCHAIN_SEND_TYPE_URL,
                &ThorchainMsgSend {
                    from_address: from.to_vec(),
                    to_address: to.to_vec(),
                    amount,
                },
            )
        } else {
            Any::pack(
                proto::BANK_SEND_TYPE_URL,
                &MsgSend {
                    from_address: payload.coin.address.trim().to_string(),
                    to_address: payload.to_address.trim().to_string(),
                    amount,
                },
            )
        };

        let body = TxBody {
            messages: vec![message],
            memo: payload.memo.clone().unwrap_or_default(),
        };
        let auth_info = AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: Some(Any::pack(
                    proto::SECP256K1_PUBKEY_TYPE_URL,
                    &PubKey { key: public_key },
                )),
                mode_info: Some(ModeInfo {
                    single: Some(ModeInfoSingle {
                        mode: proto::SIGN_MODE_DIRECT,
                    }),
                }),
                sequence,
            }],
            fee: Some(Fee {
                amount: vec![Coin {
                    denom: params.denom.to_string(),
                    amount: params.fixed_fee.unwrap_or(gas).to_string(),
                }],
                gas_limit: params.gas_limit,
            }),
        };

        let body_bytes = body.encode_to_vec();
        let auth_info_bytes = auth_info.encode_to_vec();
        let sign_doc = SignDoc {
            body_bytes: body_bytes.clone(),
            auth_info_bytes: auth_info_bytes.clone(),
            chain_id: params.chain_id.to_string(),
            account_number,
        };
        let sign_doc_hash: [u8; 32] = Sha256::digest(sign_doc.encode_to_vec()).into();

        debug!(
            chain = %chain,
            account_number,
            sequence,
            "Built Cosmos sign doc"
        );

        Ok(CosmosPlan {
            body_bytes,
            auth_info_bytes,
            sign_doc_hash,
        })
    }
}

impl ChainHelper for CosmosHelper {
    fn family(&self) -> ChainFamily {
        ChainFamily::Cosmos
    }

    fn pre_signed_image_hashes(&self, payload: &KeysignPayload) -> Result<Vec<String>, AssemblyError> {
        let plan = self.plan(payload)?;
        Ok(vec![hex::encode(plan.sign_doc_hash)])
    }

    fn assemble(
        &self,
        payload: &KeysignPayload,
        signatures: &SignatureMap,
    ) -> Result<SignedTransaction, AssemblyError> {
        let chain = payload.coin.chain;
        let plan = self.plan(payload)?;
        let hash_hex = hex::encode(plan.sign_doc_hash);

        let partial = lookup(signatures, &hash_hex).ok_or_else(|| AssemblyError::MissingSignature {
            chain,
            hash: hash_hex.clone(),
        })?;
        if signatures.len() != 1 {
            return Err(AssemblyError::SignatureCount {
                chain,
                expected: 1,
                actual: signatures.len(),
            });
        }
        let key = signature::verifying_key(&payload.coin.hex_public_key)
            .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;
        let compact = signature::verified_compact(partial, &key, &plan.sign_doc_hash)
            .map_err(|e| AssemblyError::signature(chain, &hash_hex, e))?;

        let tx_bytes = TxRaw {
            body_bytes: plan.body_bytes,
            auth_info_bytes: plan.auth_info_bytes,
            signatures: vec![compact.to_vec()],
        }
        .encode_to_vec();

        let request = BroadcastRequest {
            mode: "BROADCAST_MODE_SYNC",
            tx_bytes: Base64::encode_string(&tx_bytes),
        };
        let raw_transaction = serde_json::to_string(&request)
            .map_err(|e| AssemblyError::payload(chain, e.to_string()))?;

        Ok(SignedTransaction {
            raw_transaction,
            transaction_hash: hex::encode_upper(Sha256::digest(&tx_bytes)),
        })
    }
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::signature::hazmat::PrehashVerifier;
    use k256::ecdsa::Signature;

    use super::*;
    use crate::blockchain::payload::tests::{gaia_payload, maya_payload, thor_payload};
    use crate::blockchain::signature::tests::{compressed_hex, engine_sign, test_signing_key};

    fn signed_by_test_key(mut payload: KeysignPayload) -> (KeysignPayload, SignatureMap) {
        let key = test_signing_key();
        let params = CosmosChainParams::for_chain(payload.coin.chain).unwrap();
        payload.coin.hex_public_key = compressed_hex(&key);
        payload.coin.address =
            account_address(params.hrp, &hex::decode(&payload.coin.hex_public_key).unwrap())
                .unwrap();

        let hash = CosmosHelper.pre_signed_image_hashes(&payload).unwrap().remove(0);
        let signatures = SignatureMap::from([(hash.clone(), engine_sign(&key, &hash))]);
        (payload, signatures)
    }

    fn decode_broadcast(raw: &str) -> Vec<u8> {
        let json: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(json["mode"], "BROADCAST_MODE_SYNC");
        Base64::decode_vec(json["tx_bytes"].as_str().unwrap()).unwrap()
    }

    #[test]
    fn sign_doc_hashes() {
        assert_eq!(
            CosmosHelper.pre_signed_image_hashes(&thor_payload()).unwrap(),
            vec!["78b96e91652182d87395b12ebcf86a1883d434f1b531bfb26a386e1610bbb505".to_string()]
        );
        assert_eq!(
            CosmosHelper.pre_signed_image_hashes(&gaia_payload()).unwrap(),
            vec!["90d8117422e83833f834e724e1eacd854b350625ab221ab8efd1e2b2fba938e3".to_string()]
        );
        assert_eq!(
            CosmosHelper.pre_signed_image_hashes(&maya_payload()).unwrap(),
            vec!["4baf344ac3543a0e423338ddb31cb00bac287fad99a5954a17ebae64dc341a4b".to_string()]
        );
    }

    #[test]
    fn account_address_matches_fixture() {
        let public_key = hex::decode(&thor_payload().coin.hex_public_key).unwrap();
        assert_eq!(
            account_address("thor", &public_key).unwrap(),
            "thor16wp2f2lwhh7350zwrp6tg3u2j3c6nz7qdhk8gw"
        );
    }

    #[test]
    fn thorchain_round_trip() {
        let (payload, signatures) = signed_by_test_key(thor_payload());
        let hash = CosmosHelper.pre_signed_image_hashes(&payload).unwrap().remove(0);

        let signed = CosmosHelper.assemble(&payload, &signatures).unwrap();
        let tx_bytes = decode_broadcast(&signed.raw_transaction);
        assert_eq!(
            signed.transaction_hash,
            hex::encode_upper(Sha256::digest(&tx_bytes))
        );

        let tx = TxRaw::decode(tx_bytes.as_slice()).unwrap();
        assert_eq!(tx.signatures.len(), 1);
        let signature = Signature::from_slice(&tx.signatures[0]).unwrap();
        assert!(signature.normalize_s().is_none());
        test_signing_key()
            .verifying_key()
            .verify_prehash(&hex::decode(&hash).unwrap(), &signature)
            .unwrap();

        let body = TxBody::decode(tx.body_bytes.as_slice()).unwrap();
        assert_eq!(body.memo, "voltix");
        assert_eq!(body.messages[0].type_url, proto::THORCHAIN_SEND_TYPE_URL);
        let send = ThorchainMsgSend::decode(body.messages[0].value.as_slice()).unwrap();
        assert_eq!(send.amount[0].denom, "rune");
        assert_eq!(send.amount[0].amount, "10000000");
        assert_eq!(send.to_address.len(), 20);

        let sign_doc = SignDoc {
            body_bytes: tx.body_bytes,
            auth_info_bytes: tx.auth_info_bytes,
            chain_id: "thorchain-1".to_string(),
            account_number: 1024,
        };
        assert_eq!(hex::encode(Sha256::digest(sign_doc.encode_to_vec())), hash);
    }

    #[test]
    fn gaia_uses_bank_send_and_payload_fee() {
        let (payload, signatures) = signed_by_test_key(gaia_payload());
        let signed = CosmosHelper.assemble(&payload, &signatures).unwrap();
        let tx = TxRaw::decode(decode_broadcast(&signed.raw_transaction).as_slice()).unwrap();

        let body = TxBody::decode(tx.body_bytes.as_slice()).unwrap();
        assert_eq!(body.messages[0].type_url, proto::BANK_SEND_TYPE_URL);
        let send = MsgSend::decode(body.messages[0].value.as_slice()).unwrap();
        assert_eq!(send.from_address, payload.coin.address);
        assert_eq!(send.to_address, payload.to_address);

        let auth_info = AuthInfo::decode(tx.auth_info_bytes.as_slice()).unwrap();
        let fee = auth_info.fee.unwrap();
        assert_eq!(fee.gas_limit, 200_000);
        assert_eq!(fee.amount[0].amount, "7500");
        assert_eq!(fee.amount[0].denom, "uatom");
    }

    #[test]
    fn assembly_is_deterministic() {
        let (payload, signatures) = signed_by_test_key(maya_payload());
        assert_eq!(
            CosmosHelper.assemble(&payload, &signatures).unwrap(),
            CosmosHelper.assemble(&payload, &signatures).unwrap()
        );
    }

    #[test]
    fn signature_from_another_key_is_rejected() {
        let payload = thor_payload();
        let hash = CosmosHelper.pre_signed_image_hashes(&payload).unwrap().remove(0);
        let signatures = SignatureMap::from([(hash.clone(), engine_sign(&test_signing_key(), &hash))]);
        assert!(matches!(
            CosmosHelper.assemble(&payload, &signatures),
            Err(AssemblyError::InvalidSignature { .. })
        ));
        assert!(matches!(
            CosmosHelper.assemble(&payload, &SignatureMap::new()),
            Err(AssemblyError::MissingSignature { .. })
        ));
    }

    #[test]
    fn payload_validation() {
        let mut payload = thor_payload();
        payload.to_address = "cosmos1p5kya0922pnx8cp8ggakwudc27uv6dpqgal83v".to_string();
        assert!(matches!(
            CosmosHelper.pre_signed_image_hashes(&payload),
            Err(AssemblyError::InvalidAddress { .. })
        ));

        let mut payload = thor_payload();
        payload.coin.address = "thor1p5kya0922pnx8cp8ggakwudc27uv6dpqw6xuyn".to_string();
        assert!(matches!(
            CosmosHelper.pre_signed_image_hashes(&payload),
            Err(AssemblyError::InvalidPayload { .. })
        ));

        let mut payload = gaia_payload();
        payload.chain_specific = BlockChainSpecific::Utxo {
            byte_fee: 1,
            send_max_amount: false,
        };
        assert!(matches!(
            CosmosHelper.pre_signed_image_hashes(&payload),
            Err(AssemblyError::InvalidPayload { .. })
        ));
    }
}
