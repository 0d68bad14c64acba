// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound side of the relay: seals engine output and posts it to the
//! mediator with a per-sender sequence number.
//!
//! Engine output is sealed and numbered once, then queued. A message leaves
//! the queue only after the mediator accepted it, so a flush that gives up
//! loses nothing: the next flush resumes with the same message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::crypto::{body_hash, CryptoError, SessionCipher};
use super::message::ProtocolMessage;
use super::{Mailbox, RelayError};
use crate::engine::{self, EngineError, EngineHandle};

/// Attempts per message before giving up.
pub const SEND_ATTEMPTS: usize = 4;

/// Delay between attempts.
pub const SEND_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct Messenger<M: Mailbox> {
    mailbox: Arc<M>,
    session_id: String,
    local_party_id: String,
    scope: Option<String>,
    cipher: SessionCipher,
    next_sequence: AtomicU64,
    pending: Mutex<VecDeque<ProtocolMessage>>,
}

impl<M: Mailbox> Messenger<M> {
    pub fn new(
        mailbox: Arc<M>,
        session_id: impl Into<String>,
        local_party_id: impl Into<String>,
        scope: Option<String>,
        cipher: SessionCipher,
    ) -> Self {
        Self {
            mailbox,
            session_id: session_id.into(),
            local_party_id: local_party_id.into(),
            scope,
            cipher,
            next_sequence: AtomicU64::new(1),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn seal(&self, to: &[String], payload: &[u8]) -> Result<ProtocolMessage, CryptoError> {
        Ok(ProtocolMessage {
            session_id: self.session_id.clone(),
            from: self.local_party_id.clone(),
            to: to.to_vec(),
            body: self.cipher.seal(payload)?,
            hash: body_hash(payload),
            sequence_no: self.next_sequence.fetch_add(1, Ordering::SeqCst),
        })
    }

    /// Encrypt `payload` and post it to `to`.
    pub async fn send(&self, to: &[String], payload: &[u8]) -> Result<ProtocolMessage, SendError> {
        let message = self.seal(to, payload)?;
        self.post(&message).await?;
        Ok(message)
    }

    /// Post with bounded retry.
    async fn post(&self, message: &ProtocolMessage) -> Result<(), RelayError> {
        let mut attempt = 1;
        loop {
            match self
                .mailbox
                .post_message(&self.session_id, self.scope.as_deref(), message)
                .await
            {
                Ok(()) => {
                    debug!(
                        session_id = %self.session_id,
                        to = ?message.to,
                        sequence_no = message.sequence_no,
                        "Posted protocol message"
                    );
                    return Ok(());
                }
                Err(e) if attempt < SEND_ATTEMPTS => {
                    warn!(
                        session_id = %self.session_id,
                        attempt,
                        error = %e,
                        "Posting protocol message failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(SEND_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Relay everything the engine has queued plus anything left over from
    /// an earlier failed flush. Returns the number sent by this call.
    ///
    /// On a relay error the unsent messages stay queued in order.
    pub async fn flush(&self, engine: &EngineHandle) -> Result<usize, SendError> {
        let mut pending = self.pending.lock().await;
        for outbound in engine::drain(engine)? {
            pending.push_back(self.seal(&outbound.to, &outbound.payload)?);
        }

        let mut sent = 0;
        while let Some(message) = pending.front() {
            if let Err(e) = self.post(message).await {
                warn!(
                    session_id = %self.session_id,
                    sequence_no = message.sequence_no,
                    pending = pending.len(),
                    error = %e,
                    "Flush interrupted, keeping unsent messages"
                );
                return Err(e.into());
            }
            pending.pop_front();
            sent += 1;
        }
        Ok(sent)
    }

    /// Sealed messages waiting for a successful post.
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }
}
