// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 calldata.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};

// Define the ERC-20 interface using alloy's sol! macro
sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// `transfer(to, amount)` calldata.
pub fn transfer_call(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}

/// `approve(spender, type(uint256).max)` calldata.
pub fn approve_max_call(spender: Address) -> Bytes {
    IERC20::approveCall {
        spender,
        amount: U256::MAX,
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use alloy::hex;
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn transfer_selector_and_arguments() {
        let data = transfer_call(
            address!("fA0635a1d083D0bF377EFbD48DA46BB17e0106cA"),
            U256::from(1_000_000u64),
        );
        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(
            hex::encode(&data[4..36]),
            "000000000000000000000000fa0635a1d083d0bf377efbd48da46bb17e0106ca"
        );
        assert_eq!(U256::from_be_slice(&data[36..]), U256::from(1_000_000u64));
    }

    #[test]
    fn approve_is_always_max() {
        let data = approve_max_call(address!("fA0635a1d083D0bF377EFbD48DA46BB17e0106cA"));
        assert_eq!(hex::encode(&data[..4]), "095ea7b3");
        assert!(data[36..].iter().all(|b| *b == 0xff));
    }
}
