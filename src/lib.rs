// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational TSS Coordinator - multi-device threshold wallet coordination
//!
//! Everything around a threshold-signature engine except the cryptography
//! itself: finding the other devices of a vault, relaying their encrypted
//! protocol messages through a mediator, agreeing that everyone finished,
//! and turning the engine's signatures into broadcastable transactions.
//!
//! ## Modules
//!
//! - `relay` - Mediator client, session descriptors, puller/messenger, quorum verifier
//! - `ceremony` - Ceremony lifecycle and committee selection
//! - `engine` - Boundary to the external TSS engine
//! - `blockchain` - Pre-signing hashes and signed-transaction assembly (UTXO, EVM, Solana)
//! - `config` - Environment configuration
//! - `logging` - Tracing subscriber setup

pub mod blockchain;
pub mod ceremony;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod relay;

pub use error::CoordinatorError;
