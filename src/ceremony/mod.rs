// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ceremony Orchestrator
//!
//! Drives one keygen, reshare or keysign ceremony through its lifecycle:
//!
//! ```text
//! DiscoveringSession -> DiscoveringPeers -> AwaitingCommitteeSelection
//!     -> Running -> AwaitingQuorum -> Completed | TimedOut
//! ```
//!
//! `Failed` is reachable from every non-terminal state. State changes are
//! published on a `tokio::sync::watch` channel; reaching a terminal state
//! stops the relay and releases the session.

pub mod state;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

pub use state::{is_terminal, validate_transition, CeremonyState};

use crate::blockchain::KeysignSignature;
use crate::config::{CoordinatorConfig, DEFAULT_DEDUP_CACHE_CAPACITY};
use crate::engine::EngineHandle;
use crate::relay::discovery::{self, START_TIMEOUT};
use crate::relay::messenger::SendError;
use crate::relay::verifier::QUORUM_TIMEOUT;
use crate::relay::{
    ApplyFailure, CryptoError, Mailbox, MessagePuller, Messenger, PeerDiscovery, QuorumVerifier,
    RelayError, Session,
};

/// Apply failures tolerated before the ceremony is abandoned.
pub const MAX_APPLY_FAILURES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum CeremonyError {
    #[error("Invalid ceremony transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid committee: {0}")]
    InvalidCommittee(String),

    #[error("Committee for session {session_id} not published within {timeout_secs}s")]
    StartTimeout { session_id: String, timeout_secs: u64 },

    #[error("Quorum for session {session_id} not reached within {timeout_secs}s")]
    QuorumTimeout { session_id: String, timeout_secs: u64 },

    #[error("{count} protocol messages failed to apply")]
    TooManyApplyFailures { count: usize },

    #[error("Engine failed: {0}")]
    EngineFailed(String),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Send(SendError),
}

/// Signers needed for a committee of `parties` members: ⌈2n/3⌉.
pub fn required_signers(parties: usize) -> usize {
    (2 * parties).div_ceil(3)
}

/// Ordered set of unique party ids taking part in a ceremony.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committee {
    parties: Vec<String>,
    threshold: usize,
}

impl Committee {
    pub fn new(parties: Vec<String>, threshold: usize) -> Result<Self, CeremonyError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = parties.iter().find(|party| !seen.insert(party.as_str())) {
            return Err(CeremonyError::InvalidCommittee(format!(
                "duplicate party {duplicate}"
            )));
        }
        if threshold == 0 || parties.len() < threshold {
            return Err(CeremonyError::InvalidCommittee(format!(
                "{} parties for a threshold of {threshold}",
                parties.len()
            )));
        }

        Ok(Self { parties, threshold })
    }

    pub fn parties(&self) -> &[String] {
        &self.parties
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn contains(&self, party_id: &str) -> bool {
        self.parties.iter().any(|party| party == party_id)
    }

    /// Members of the old committee that were selected again, in their old
    /// order. Fails when fewer than the old vault's threshold remain.
    pub fn for_reshare(&self, old_parties: &[String]) -> Result<Vec<String>, CeremonyError> {
        let retained: Vec<String> = old_parties
            .iter()
            .filter(|party| self.contains(party))
            .cloned()
            .collect();

        let needed = required_signers(old_parties.len());
        if retained.len() < needed {
            return Err(CeremonyError::InvalidCommittee(format!(
                "{} of the old committee selected, {needed} needed",
                retained.len()
            )));
        }
        Ok(retained)
    }
}

/// Relay pieces that live while the ceremony is running.
struct Relay<M: Mailbox> {
    puller: MessagePuller<M>,
    messenger: Messenger<M>,
    failures: mpsc::UnboundedReceiver<ApplyFailure>,
    engine: EngineHandle,
}

/// One ceremony as seen from the local device.
pub struct Ceremony<M: Mailbox> {
    mailbox: Arc<M>,
    session: Session,
    local_party_id: String,
    scope: Option<String>,
    state: watch::Sender<CeremonyState>,
    committee: Option<Committee>,
    relay: Option<Relay<M>>,
    apply_failures: usize,
    dedup_capacity: usize,
}

impl<M: Mailbox> Ceremony<M> {
    pub fn new(mailbox: Arc<M>, session: Session, local_party_id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(CeremonyState::DiscoveringSession);
        Self {
            mailbox,
            session,
            local_party_id: local_party_id.into(),
            scope: None,
            state,
            committee: None,
            relay: None,
            apply_failures: 0,
            dedup_capacity: DEFAULT_DEDUP_CACHE_CAPACITY,
        }
    }

    /// Ceremony with the relay bounds from `config`.
    pub fn from_config(
        mailbox: Arc<M>,
        session: Session,
        local_party_id: impl Into<String>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self::new(mailbox, session, local_party_id).with_dedup_capacity(config.dedup_cache_capacity)
    }

    /// Separate concurrent signings in one session (one per message hash).
    pub fn with_message_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Bound the relay dedup cache (`DEDUP_CACHE_CAPACITY`).
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<CeremonyState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CeremonyState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn committee(&self) -> Option<&Committee> {
        self.committee.as_ref()
    }

    pub fn apply_failures(&self) -> usize {
        self.apply_failures
    }

    fn transition(&self, to: CeremonyState) -> Result<(), CeremonyError> {
        let from = self.state();
        validate_transition(&from, &to)?;
        info!(
            session_id = %self.session.session_id,
            party_id = %self.local_party_id,
            from = %from,
            to = %to,
            "Ceremony state changed"
        );
        self.state.send_replace(to);
        Ok(())
    }

    /// Register the local party with the mediator.
    pub async fn join(&mut self) -> Result<(), CeremonyError> {
        self.mailbox
            .join_session(&self.session.session_id, &self.local_party_id)
            .await?;
        self.transition(CeremonyState::DiscoveringPeers)
    }

    /// Start watching for other parties joining the session.
    pub fn discover_peers(&self) -> PeerDiscovery {
        PeerDiscovery::spawn(self.mailbox.clone(), self.session.session_id.clone())
    }

    /// Initiator: fix the committee and publish it to the joiners.
    pub async fn propose_committee(
        &mut self,
        parties: Vec<String>,
        threshold: usize,
    ) -> Result<&Committee, CeremonyError> {
        if self.state() == CeremonyState::DiscoveringPeers {
            self.transition(CeremonyState::AwaitingCommitteeSelection)?;
        }

        let committee = Committee::new(parties, threshold)?;
        if !committee.contains(&self.local_party_id) {
            return Err(CeremonyError::InvalidCommittee(format!(
                "local party {} not selected",
                self.local_party_id
            )));
        }

        self.mailbox
            .start_session(&self.session.session_id, committee.parties())
            .await?;
        Ok(self.committee.insert(committee))
    }

    /// Joiner: wait for the initiator's committee.
    pub async fn await_committee(&mut self, threshold: usize) -> Result<&Committee, CeremonyError> {
        self.transition(CeremonyState::AwaitingCommitteeSelection)?;

        let Some(parties) =
            discovery::await_start(self.mailbox.as_ref(), &self.session.session_id).await
        else {
            self.fail("committee was never published").await?;
            return Err(CeremonyError::StartTimeout {
                session_id: self.session.session_id.clone(),
                timeout_secs: START_TIMEOUT.as_secs(),
            });
        };

        let committee = match Committee::new(parties, threshold) {
            Ok(committee) => committee,
            Err(e) => {
                self.fail(&e.to_string()).await?;
                return Err(e);
            }
        };
        if !committee.contains(&self.local_party_id) {
            self.fail("local party not selected").await?;
            return Err(CeremonyError::InvalidCommittee(format!(
                "local party {} not selected",
                self.local_party_id
            )));
        }
        Ok(self.committee.insert(committee))
    }

    /// Start relaying protocol traffic for `engine`.
    pub fn start_relay(&mut self, engine: EngineHandle) -> Result<(), CeremonyError> {
        if self.committee.is_none() {
            return Err(CeremonyError::InvalidCommittee(
                "no committee selected".to_string(),
            ));
        }
        let cipher = self.session.cipher()?;
        self.transition(CeremonyState::Running)?;

        let mut puller = MessagePuller::new(
            self.mailbox.clone(),
            self.session.session_id.clone(),
            self.local_party_id.clone(),
            self.scope.clone(),
            cipher.clone(),
        )
        .with_cache_capacity(self.dedup_capacity);
        let failures = puller.start(engine.clone());
        let messenger = Messenger::new(
            self.mailbox.clone(),
            self.session.session_id.clone(),
            self.local_party_id.clone(),
            self.scope.clone(),
            cipher,
        );

        self.relay = Some(Relay {
            puller,
            messenger,
            failures,
            engine,
        });
        Ok(())
    }

    /// Send everything the engine has queued and account for apply
    /// failures. Returns the number of messages sent.
    ///
    /// A relay error leaves the ceremony `Running`. Messages the mediator
    /// did not accept stay queued and go out first on the next pump.
    pub async fn pump(&mut self) -> Result<usize, CeremonyError> {
        let Some(relay) = self.relay.as_mut() else {
            return Err(CeremonyError::InvalidTransition {
                from: self.state().to_string(),
                to: CeremonyState::Running.to_string(),
            });
        };

        while let Ok(failure) = relay.failures.try_recv() {
            self.apply_failures += 1;
            warn!(
                session_id = %failure.session_id,
                from = %failure.from,
                hash = %failure.hash,
                failures = self.apply_failures,
                error = %failure.reason,
                "Protocol message failed to apply"
            );
        }
        if self.apply_failures >= MAX_APPLY_FAILURES {
            let count = self.apply_failures;
            self.fail(&format!("{count} protocol messages failed to apply"))
                .await?;
            return Err(CeremonyError::TooManyApplyFailures { count });
        }

        let flushed = match self.relay.as_ref() {
            Some(relay) => relay.messenger.flush(&relay.engine).await,
            None => Ok(0),
        };
        match flushed {
            Ok(sent) => Ok(sent),
            Err(SendError::Engine(e)) => {
                let reason = e.to_string();
                self.fail(&reason).await?;
                Err(CeremonyError::EngineFailed(reason))
            }
            Err(e) => Err(CeremonyError::Send(e)),
        }
    }

    /// Abandon the ceremony.
    pub async fn fail(&mut self, reason: &str) -> Result<(), CeremonyError> {
        self.transition(CeremonyState::Failed {
            reason: reason.to_string(),
        })?;
        self.release().await;
        Ok(())
    }

    /// Report local completion and wait for the rest of the committee.
    pub async fn finish(&mut self) -> Result<(), CeremonyError> {
        let committee = self
            .committee
            .as_ref()
            .map(|committee| committee.parties().to_vec())
            .ok_or_else(|| CeremonyError::InvalidCommittee("no committee selected".to_string()))?;
        self.transition(CeremonyState::AwaitingQuorum)?;

        let verifier = self.verifier(committee);
        let marking = verifier.mark_local_complete();
        let reached = verifier.await_quorum().await;
        marking.abort();

        if reached {
            self.transition(CeremonyState::Completed)?;
            self.release().await;
            Ok(())
        } else {
            self.transition(CeremonyState::TimedOut)?;
            self.release().await;
            Err(CeremonyError::QuorumTimeout {
                session_id: self.session.session_id.clone(),
                timeout_secs: QUORUM_TIMEOUT.as_secs(),
            })
        }
    }

    /// Publish the local signature over `message` so a peer whose engine
    /// failed on it can recover it.
    pub async fn publish_signature(
        &self,
        message: &str,
        signature: &KeysignSignature,
    ) -> Result<(), CeremonyError> {
        let verifier = self.verifier(self.committee_parties());
        Ok(verifier.mark_keysign_complete(message, signature).await?)
    }

    /// Signature over `message` published by another committee member.
    pub async fn recover_signature(&self, message: &str) -> Option<KeysignSignature> {
        self.verifier(self.committee_parties())
            .check_keysign_complete(message)
            .await
    }

    fn committee_parties(&self) -> Vec<String> {
        self.committee
            .as_ref()
            .map(|committee| committee.parties().to_vec())
            .unwrap_or_default()
    }

    fn verifier(&self, committee: Vec<String>) -> QuorumVerifier<M> {
        QuorumVerifier::new(
            self.mailbox.clone(),
            self.session.session_id.clone(),
            self.local_party_id.clone(),
            committee,
        )
    }

    async fn release(&mut self) {
        if let Some(mut relay) = self.relay.take() {
            relay.puller.stop().await;
        }
    }
}
