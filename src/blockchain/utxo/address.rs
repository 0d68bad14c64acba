// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address decoding for Bitcoin-family chains.
//!
//! Supports base58check (P2PKH / P2SH), bech32 and bech32m segwit programs
//! and Bitcoin Cash CashAddr, with or without the `bitcoincash:` prefix.

use super::params::UtxoChainParams;
use super::script::Destination;
use super::tx::double_sha256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("not a valid address for this chain")]
    WrongNetwork,

    #[error("bad checksum")]
    Checksum,

    #[error("bad encoding: {0}")]
    Encoding(String),

    #[error("unsupported address type")]
    Unsupported,
}

/// Decode `address` into the output it pays to.
pub fn decode(params: &UtxoChainParams, address: &str) -> Result<Destination, AddressError> {
    let address = address.trim();

    if let Some(prefix) = params.cashaddr_prefix {
        if let Some(destination) = decode_cashaddr(prefix, address)? {
            return Ok(destination);
        }
    }

    if let Some(hrp) = params.bech32_hrp {
        let lower = address.to_ascii_lowercase();
        if lower.starts_with(&format!("{hrp}1")) {
            return decode_segwit(hrp, address);
        }
    }

    decode_base58(params, address)
}

fn decode_base58(params: &UtxoChainParams, address: &str) -> Result<Destination, AddressError> {
    let raw = bs58::decode(address)
        .into_vec()
        .map_err(|e| AddressError::Encoding(e.to_string()))?;
    if raw.len() != 25 {
        return Err(AddressError::Encoding(format!("unexpected length {}", raw.len())));
    }

    let (body, checksum) = raw.split_at(21);
    if double_sha256(body)[..4] != *checksum {
        return Err(AddressError::Checksum);
    }

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&body[1..]);
    let version = body[0];
    if version == params.p2pkh_version {
        Ok(Destination::P2pkh(hash))
    } else if params.p2sh_versions.contains(&version) {
        Ok(Destination::P2sh(hash))
    } else {
        Err(AddressError::WrongNetwork)
    }
}

fn decode_segwit(hrp: &str, address: &str) -> Result<Destination, AddressError> {
    let (decoded_hrp, version, program) =
        bech32::segwit::decode(address).map_err(|e| AddressError::Encoding(e.to_string()))?;
    if decoded_hrp.to_lowercase() != hrp {
        return Err(AddressError::WrongNetwork);
    }

    match (version.to_u8(), program.len()) {
        (0, 20) => Ok(Destination::P2wpkh(to_array(&program))),
        (0, 32) => Ok(Destination::P2wsh(to_array(&program))),
        (1, 32) => Ok(Destination::P2tr(to_array(&program))),
        _ => Err(AddressError::Unsupported),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

const CASHADDR_CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

fn cashaddr_polymod(values: impl IntoIterator<Item = u8>) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ u64::from(d);
        for (i, generator) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 == 1 {
                c ^= generator;
            }
        }
    }
    c ^ 1
}

/// Decode a CashAddr. `Ok(None)` when the string is not CashAddr at all,
/// so the caller can fall back to legacy base58.
fn decode_cashaddr(prefix: &str, address: &str) -> Result<Option<Destination>, AddressError> {
    let (given_prefix, payload) = match address.split_once(':') {
        Some((p, rest)) => (Some(p), rest),
        None => (None, address),
    };
    if let Some(p) = given_prefix {
        if !p.eq_ignore_ascii_case(prefix) {
            return Err(AddressError::WrongNetwork);
        }
    }

    let mut values = Vec::with_capacity(payload.len());
    for byte in payload.bytes() {
        match CASHADDR_CHARSET
            .iter()
            .position(|c| *c == byte.to_ascii_lowercase())
        {
            Some(value) => values.push(value as u8),
            // Legacy base58 addresses contain characters outside the set.
            None if given_prefix.is_none() => return Ok(None),
            None => return Err(AddressError::Encoding("invalid character".to_string())),
        }
    }
    if values.len() < 8 + 34 {
        if given_prefix.is_none() {
            return Ok(None);
        }
        return Err(AddressError::Encoding("too short".to_string()));
    }

    let has_upper = payload.bytes().any(|b| b.is_ascii_uppercase());
    let has_lower = payload.bytes().any(|b| b.is_ascii_lowercase());
    if has_upper && has_lower {
        return Err(AddressError::Encoding("mixed case".to_string()));
    }

    let checksum_input = prefix
        .bytes()
        .map(|b| b & 0x1f)
        .chain(std::iter::once(0))
        .chain(values.iter().copied());
    if cashaddr_polymod(checksum_input) != 0 {
        return Err(AddressError::Checksum);
    }

    let data = &values[..values.len() - 8];
    let bytes = convert_bits(data, 5, 8)?;
    let (version, hash) = bytes
        .split_first()
        .ok_or_else(|| AddressError::Encoding("empty payload".to_string()))?;
    if version & 0x07 != 0 || hash.len() != 20 {
        return Err(AddressError::Unsupported);
    }

    match version >> 3 {
        0 => Ok(Some(Destination::P2pkh(to_array(hash)))),
        1 => Ok(Some(Destination::P2sh(to_array(hash)))),
        _ => Err(AddressError::Unsupported),
    }
}

/// Regroup bits without padding, rejecting non-zero leftover bits.
fn convert_bits(data: &[u8], from: u32, to: u32) -> Result<Vec<u8>, AddressError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize);

    for value in data {
        acc = (acc << from) | u32::from(*value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max) as u8);
        }
    }
    if bits >= from || (acc << (to - bits)) & max != 0 {
        return Err(AddressError::Encoding("invalid padding".to_string()));
    }
    Ok(out)
}
