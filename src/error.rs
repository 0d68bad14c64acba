// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::blockchain::AssemblyError;
use crate::ceremony::CeremonyError;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::relay::messenger::SendError;
use crate::relay::{CryptoError, DescriptorError, RelayError};

pub const MSG_RELAY_UNREACHABLE: &str = "could not reach relay";
pub const MSG_PEER_TIMEOUT: &str = "peer did not complete in time";
pub const MSG_SIGNING_FAILED: &str = "signing failed — please retry";

/// Top-level error surfaced to the embedding application.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("Quorum for session {session_id} not reached within {timeout_secs}s")]
    QuorumTimeout { session_id: String, timeout_secs: u64 },

    #[error(transparent)]
    Ceremony(CeremonyError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<CeremonyError> for CoordinatorError {
    fn from(err: CeremonyError) -> Self {
        match err {
            CeremonyError::QuorumTimeout {
                session_id,
                timeout_secs,
            } => Self::QuorumTimeout {
                session_id,
                timeout_secs,
            },
            CeremonyError::Relay(e) => Self::Relay(e),
            CeremonyError::Crypto(e) => Self::Crypto(e),
            CeremonyError::Send(SendError::Relay(e)) => Self::Relay(e),
            CeremonyError::Send(SendError::Crypto(e)) => Self::Crypto(e),
            CeremonyError::Send(SendError::Engine(e)) => Self::Engine(e),
            other => Self::Ceremony(other),
        }
    }
}

impl From<SendError> for CoordinatorError {
    fn from(err: SendError) -> Self {
        CeremonyError::Send(err).into()
    }
}

impl CoordinatorError {
    /// Short message suitable for showing to the wallet user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Relay(_) => MSG_RELAY_UNREACHABLE,
            Self::QuorumTimeout { .. } | Self::Ceremony(CeremonyError::StartTimeout { .. }) => {
                MSG_PEER_TIMEOUT
            }
            _ => MSG_SIGNING_FAILED,
        }
    }
}
