// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mediator relay: transport, session descriptors, discovery, the encrypted
//! message puller/messenger and the completion verifier.
//!
//! Every component talks to the mediator through the [`Mailbox`] trait so a
//! ceremony can be driven against the HTTP [`MediatorClient`] or an
//! in-process mailbox.

use std::future::Future;

use crate::blockchain::KeysignSignature;

pub mod client;
pub mod crypto;
pub mod discovery;
pub mod message;
pub mod messenger;
pub mod puller;
pub mod session;
pub mod verifier;

#[cfg(test)]
pub(crate) mod memory;

pub use client::{MediatorClient, RelayError};
pub use crypto::{CryptoError, SessionCipher};
pub use discovery::PeerDiscovery;
pub use message::ProtocolMessage;
pub use messenger::Messenger;
pub use puller::{ApplyFailure, MessagePuller};
pub use session::{DescriptorError, Session, SessionDescriptor};
pub use verifier::QuorumVerifier;

/// Store-and-forward mailbox operations exposed by the mediator.
///
/// "Nothing stored yet" is never an error: list operations return an empty
/// list and `started_committee` returns `None`.
pub trait Mailbox: Send + Sync + 'static {
    /// Register `party_id` as joined to `session_id`.
    fn join_session(
        &self,
        session_id: &str,
        party_id: &str,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Parties that have joined so far.
    fn joined_parties(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, RelayError>> + Send;

    /// Publish the selected committee, starting the ceremony.
    fn start_session(
        &self,
        session_id: &str,
        committee: &[String],
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Committee published by the initiator, if the ceremony has started.
    fn started_committee(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<Vec<String>>, RelayError>> + Send;

    fn mark_complete(
        &self,
        session_id: &str,
        party_id: &str,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    fn completed_parties(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, RelayError>> + Send;

    /// Publish the signature the local engine produced for one keysign
    /// message, keyed by its message id.
    fn publish_keysign_signature(
        &self,
        session_id: &str,
        message_id: &str,
        signature: &KeysignSignature,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Signature a peer published for `message_id`, if any.
    fn keysign_signature(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> impl Future<Output = Result<Option<KeysignSignature>, RelayError>> + Send;

    fn post_message(
        &self,
        session_id: &str,
        scope: Option<&str>,
        message: &ProtocolMessage,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;

    /// Pending messages addressed to `party_id`, in mediator order.
    fn fetch_messages(
        &self,
        session_id: &str,
        party_id: &str,
        scope: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ProtocolMessage>, RelayError>> + Send;

    fn delete_message(
        &self,
        session_id: &str,
        party_id: &str,
        hash: &str,
        scope: Option<&str>,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;
}
