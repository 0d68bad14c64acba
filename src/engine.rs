// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Boundary to the threshold-signature engine.
//!
//! The coordinator never looks inside protocol messages. It feeds decrypted
//! inbound bytes to the engine and relays whatever the engine wants to send.

use std::sync::{Arc, Mutex};

/// Bytes the engine wants delivered to other committee members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: Vec<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine rejected message: {0}")]
    Rejected(String),

    #[error("Engine protocol failure: {0}")]
    Protocol(String),

    #[error("Engine lock poisoned")]
    Poisoned,
}

/// A single-threaded TSS engine instance driving one ceremony.
pub trait TssEngine: Send {
    /// Advance the protocol with one decrypted inbound message.
    fn apply_inbound_bytes(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    /// Take every message produced since the last call.
    fn drain_outbound_bytes(&mut self) -> Vec<OutboundMessage>;
}

/// Shared handle to an engine. Locked per message; never held across I/O.
pub type EngineHandle = Arc<Mutex<dyn TssEngine>>;

/// Apply one message under the engine lock.
pub fn apply(engine: &EngineHandle, bytes: &[u8]) -> Result<(), EngineError> {
    let mut engine = engine.lock().map_err(|_| EngineError::Poisoned)?;
    engine.apply_inbound_bytes(bytes)
}

/// Drain outbound messages under the engine lock.
pub fn drain(engine: &EngineHandle) -> Result<Vec<OutboundMessage>, EngineError> {
    let mut engine = engine.lock().map_err(|_| EngineError::Poisoned)?;
    Ok(engine.drain_outbound_bytes())
}
