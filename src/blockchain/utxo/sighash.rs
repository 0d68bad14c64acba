// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature hashes. Legacy and segwit v0 come from `bitcoin`'s
//! `SighashCache`; Bitcoin Cash's FORKID variant is the BIP143 preimage
//! with a sighash type `bitcoin` cannot express.

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::Hash;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Amount, Script, Transaction};

use super::tx::double_sha256;

#[derive(Debug, thiserror::Error)]
#[error("cannot hash input {index}: {reason}")]
pub struct SighashError {
    pub index: usize,
    pub reason: String,
}

fn error(index: usize, reason: impl ToString) -> SighashError {
    SighashError {
        index,
        reason: reason.to_string(),
    }
}

/// Legacy sighash for `input_index`, committing to `script_pubkey`.
pub fn legacy(
    tx: &Transaction,
    input_index: usize,
    script_pubkey: &Script,
    sighash_type: u32,
) -> Result<[u8; 32], SighashError> {
    SighashCache::new(tx)
        .legacy_signature_hash(input_index, script_pubkey, sighash_type)
        .map(|hash| hash.to_byte_array())
        .map_err(|e| error(input_index, e))
}

/// BIP143 SIGHASH_ALL for a P2WPKH input. Commits to the spent amount.
pub fn p2wpkh(
    cache: &mut SighashCache<&Transaction>,
    input_index: usize,
    script_pubkey: &Script,
    amount: u64,
) -> Result<[u8; 32], SighashError> {
    cache
        .p2wpkh_signature_hash(
            input_index,
            script_pubkey,
            Amount::from_sat(amount),
            EcdsaSighashType::All,
        )
        .map(|hash| hash.to_byte_array())
        .map_err(|e| error(input_index, e))
}

/// BIP143 preimage with Bitcoin Cash's SIGHASH_FORKID type.
pub fn forkid(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount: u64,
    sighash_type: u32,
) -> Result<[u8; 32], SighashError> {
    let input = tx
        .input
        .get(input_index)
        .ok_or_else(|| error(input_index, format!("{} inputs", tx.input.len())))?;

    let mut prevouts = Vec::with_capacity(36 * tx.input.len());
    let mut sequences = Vec::with_capacity(4 * tx.input.len());
    for txin in &tx.input {
        prevouts.extend(serialize(&txin.previous_output));
        sequences.extend_from_slice(&txin.sequence.0.to_le_bytes());
    }
    let outputs: Vec<u8> = tx.output.iter().flat_map(|txout| serialize(txout)).collect();

    let mut preimage = Vec::with_capacity(156 + script_code.len());
    preimage.extend_from_slice(&tx.version.0.to_le_bytes());
    preimage.extend_from_slice(&double_sha256(&prevouts));
    preimage.extend_from_slice(&double_sha256(&sequences));
    preimage.extend(serialize(&input.previous_output));
    preimage.extend(serialize(&script_code.to_owned()));
    preimage.extend_from_slice(&amount.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.0.to_le_bytes());
    preimage.extend_from_slice(&double_sha256(&outputs));
    preimage.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    preimage.extend_from_slice(&sighash_type.to_le_bytes());
    Ok(double_sha256(&preimage))
}

#[cfg(test)]
mod tests {
    use alloy::hex;
    use bitcoin::{ScriptBuf, TxOut};

    use super::*;
    use crate::blockchain::utxo::params::{SIGHASH_ALL, SIGHASH_ALL_FORKID};
    use crate::blockchain::utxo::script::{op_return, Destination};
    use crate::blockchain::utxo::tx::{outpoint, unsigned_input, unsigned_transaction};

    const OWN: &str = "d382a4abeebdfd1a3c4e1874b4478a9471a98bc0";

    fn hash20(s: &str) -> [u8; 20] {
        hex::decode(s).unwrap().try_into().unwrap()
    }

    fn input() -> bitcoin::TxIn {
        unsigned_input(
            outpoint(
                "71787a90556de944fcea8d8ff7478e535092638a68491b60b5661dfd871c40e4",
                0,
            )
            .unwrap(),
        )
    }

    fn pay(destination: Destination, value: u64) -> TxOut {
        TxOut {
            value: Amount::from_sat(value),
            script_pubkey: destination.script_pubkey(),
        }
    }

    fn p2pkh(hash: &str) -> ScriptBuf {
        Destination::P2pkh(hash20(hash)).script_pubkey()
    }

    #[test]
    fn bitcoin_cash_forkid_sighash() {
        let tx = unsigned_transaction(
            vec![input()],
            vec![
                pay(Destination::P2pkh(hash20("0d2c4ebcaa506663e027423b6771b857b8cd3420")), 1_000_000),
                pay(Destination::P2pkh(hash20(OWN)), 8_994_800),
                TxOut {
                    value: Amount::ZERO,
                    script_pubkey: op_return(b"voltix").unwrap(),
                },
            ],
        );

        let hash = forkid(&tx, 0, &p2pkh(OWN), 10_000_000, SIGHASH_ALL_FORKID).unwrap();
        assert_eq!(
            hex::encode(hash),
            "195b256774ca393f2e9812478abf6958076d0ff7d427dc958d35a9f7ffe7439b"
        );
        assert!(forkid(&tx, 1, &p2pkh(OWN), 10_000_000, SIGHASH_ALL_FORKID).is_err());
    }

    #[test]
    fn legacy_sighash() {
        let tx = unsigned_transaction(
            vec![input()],
            vec![
                pay(Destination::P2pkh(hash20("0d2c4ebcaa506663e027423b6771b857b8cd3420")), 5_000_000),
                pay(Destination::P2pkh(hash20(OWN)), 4_774_000),
            ],
        );

        let hash = legacy(&tx, 0, &p2pkh(OWN), SIGHASH_ALL).unwrap();
        assert_eq!(
            hex::encode(hash),
            "947ce9e62cd4a9fc9dea4bd3a7d5aae2e902a92f66d5a85378ada5a153cd8468"
        );
    }

    #[test]
    fn segwit_v0_sighash() {
        let own = Destination::P2wpkh(hash20(OWN));
        let tx = unsigned_transaction(
            vec![input()],
            vec![
                pay(
                    Destination::P2wpkh(hash20("751e76e8199196d454941c45d1b3a323f1433bd6")),
                    1_000_000,
                ),
                pay(own.clone(), 8_996_520),
            ],
        );

        let mut cache = SighashCache::new(&tx);
        let hash = p2wpkh(&mut cache, 0, &own.script_pubkey(), 10_000_000).unwrap();
        assert_eq!(
            hex::encode(hash),
            "999d1d2297f6f57dcce9637e813ded856677f709eae2ce304670fba1297f912c"
        );
    }

    #[test]
    fn legacy_ignores_existing_signatures() {
        let mut tx = unsigned_transaction(
            vec![input(), input()],
            vec![pay(Destination::P2pkh(hash20(OWN)), 1)],
        );
        let before = legacy(&tx, 1, &p2pkh(OWN), SIGHASH_ALL).unwrap();
        tx.input[0].script_sig = ScriptBuf::from_bytes(vec![0xaa; 10]);
        assert_eq!(legacy(&tx, 1, &p2pkh(OWN), SIGHASH_ALL).unwrap(), before);
    }
}
