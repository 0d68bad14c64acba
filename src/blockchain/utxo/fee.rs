// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Size-based fee estimation.

/// How the wallet's own inputs are spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// P2PKH with a scriptSig.
    Legacy,
    /// P2WPKH with a witness.
    Segwit,
}

/// Estimated fee in base units for a transaction of this shape.
///
/// Legacy: `10 + 148·in + 34·out` bytes. Segwit: the same shape in weight
/// units, `40 + 405·in + 124·out`, rounded up to virtual bytes.
pub fn estimate(kind: InputKind, inputs: usize, outputs: usize, byte_fee: u64) -> u64 {
    let inputs = inputs as u64;
    let outputs = outputs as u64;
    let size = match kind {
        InputKind::Legacy => 10 + 148 * inputs + 34 * outputs,
        InputKind::Segwit => (40 + 405 * inputs + 124 * outputs).div_ceil(4),
    };
    size.saturating_mul(byte_fee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_counts_every_output() {
        assert_eq!(estimate(InputKind::Legacy, 1, 3, 20), 5200);
        assert_eq!(estimate(InputKind::Legacy, 1, 2, 1000), 226_000);
    }

    #[test]
    fn segwit_rounds_up_to_vbytes() {
        // 693 wu -> 174 vB
        assert_eq!(estimate(InputKind::Segwit, 1, 2, 20), 3480);
        assert_eq!(estimate(InputKind::Segwit, 2, 1, 1), (40 + 810 + 124_u64).div_ceil(4));
    }

    #[test]
    fn zero_fee_rate() {
        assert_eq!(estimate(InputKind::Legacy, 5, 5, 0), 0);
    }
}
