// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Message Puller
//!
//! Background task that drains the local party's mediator mailbox into the
//! TSS engine.
//!
//! ## Strategy
//!
//! Every `PULL_INTERVAL` (1 s) the puller:
//! 1. Fetches pending messages for `(session, party)`, scoped by the
//!    optional `message_id` discriminator.
//! 2. Sorts the batch by `sequence_no`.
//! 3. For each message not yet in the dedup cache: decrypts, applies to the
//!    engine, records the cache key and spawns a best-effort DELETE.
//!
//! The dedup cache, not server-side deletion, is what guarantees each
//! message is applied at most once. A message that fails to decrypt or
//! apply is still recorded and deleted (it would fail the same way again)
//! and is reported on the [`ApplyFailure`] channel.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`. A pending fetch is abandoned
//! immediately, but a batch that is being applied always runs to completion.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::crypto::SessionCipher;
use super::message::ProtocolMessage;
use super::Mailbox;
use crate::config::DEFAULT_DEDUP_CACHE_CAPACITY;
use crate::engine::{self, EngineHandle};

/// Fixed delay between mailbox polls, and the back-off after a failed one.
pub const PULL_INTERVAL: Duration = Duration::from_secs(1);

/// A message that could not be decrypted or applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub session_id: String,
    pub party_id: String,
    pub from: String,
    pub hash: String,
    pub sequence_no: u64,
    pub reason: String,
}

/// Bounded set of already-applied message keys.
pub struct DedupCache {
    keys: Mutex<LruCache<String, ()>>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            keys: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Keys remain valid after a panic in another lock holder.
    fn keys(&self) -> MutexGuard<'_, LruCache<String, ()>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().contains(key)
    }

    pub fn insert(&self, key: String) {
        self.keys().put(key, ());
    }

    pub fn clear(&self) {
        self.keys().clear();
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pulls, decrypts and applies protocol messages for one local party.
pub struct MessagePuller<M: Mailbox> {
    mailbox: Arc<M>,
    session_id: String,
    local_party_id: String,
    scope: Option<String>,
    cipher: SessionCipher,
    cache: Arc<DedupCache>,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<M: Mailbox> MessagePuller<M> {
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
            cache: Arc::new(DedupCache::new(DEFAULT_DEDUP_CACHE_CAPACITY)),
            running: None,
        }
    }

    /// Override the dedup cache bound. Only effective before `start`.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = Arc::new(DedupCache::new(capacity));
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Number of messages consumed since the last `start`.
    pub fn consumed(&self) -> usize {
        self.cache.len()
    }

    /// Spawn the polling loop feeding `engine`.
    ///
    /// Returns the channel on which decode/apply failures are reported.
    /// Calling `start` on a running puller replaces the previous loop.
    pub fn start(&mut self, engine: EngineHandle) -> mpsc::UnboundedReceiver<ApplyFailure> {
        if let Some((token, _)) = self.running.take() {
            token.cancel();
        }

        let (failures_tx, failures_rx) = mpsc::unbounded_channel();
        let worker = PullWorker {
            mailbox: self.mailbox.clone(),
            session_id: self.session_id.clone(),
            party_id: self.local_party_id.clone(),
            scope: self.scope.clone(),
            cipher: self.cipher.clone(),
            cache: self.cache.clone(),
            engine,
            failures: failures_tx,
        };

        let token = CancellationToken::new();
        let task = tokio::spawn(worker.run(token.clone()));
        self.running = Some((token, task));
        failures_rx
    }

    /// Stop polling and discard the dedup cache.
    ///
    /// Waits for an in-flight batch to finish applying.
    pub async fn stop(&mut self) {
        if let Some((token, task)) = self.running.take() {
            token.cancel();
            if let Err(e) = task.await {
                warn!(session_id = %self.session_id, error = %e, "Message puller task ended abnormally");
            }
        }
        self.cache.clear();
    }
}

impl<M: Mailbox> Drop for MessagePuller<M> {
    fn drop(&mut self) {
        if let Some((token, _)) = self.running.take() {
            token.cancel();
        }
    }
}

struct PullWorker<M: Mailbox> {
    mailbox: Arc<M>,
    session_id: String,
    party_id: String,
    scope: Option<String>,
    cipher: SessionCipher,
    cache: Arc<DedupCache>,
    engine: EngineHandle,
    failures: mpsc::UnboundedSender<ApplyFailure>,
}

impl<M: Mailbox> PullWorker<M> {
    async fn run(self, shutdown: CancellationToken) {
        info!(
            session_id = %self.session_id,
            party_id = %self.party_id,
            scope = ?self.scope,
            "Message puller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let fetched = tokio::select! {
                result = self.mailbox.fetch_messages(&self.session_id, &self.party_id, self.scope.as_deref()) => Some(result),
                _ = shutdown.cancelled() => None,
            };

            match fetched {
                None => break,
                Some(Ok(batch)) => self.apply_batch(batch),
                Some(Err(e)) => {
                    warn!(
                        session_id = %self.session_id,
                        party_id = %self.party_id,
                        error = %e,
                        "Message puller: fetch failed, retrying"
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(PULL_INTERVAL) => {},
                _ = shutdown.cancelled() => break,
            }
        }

        info!(session_id = %self.session_id, party_id = %self.party_id, "Message puller stopped");
    }

    fn apply_batch(&self, mut batch: Vec<ProtocolMessage>) {
        batch.sort_by_key(|m| m.sequence_no);

        for message in batch {
            let key = message.cache_key(&self.session_id, &self.party_id, self.scope.as_deref());
            if self.cache.contains(&key) {
                continue;
            }

            let outcome = self
                .cipher
                .open(&message.body)
                .map_err(|e| e.to_string())
                .and_then(|plaintext| {
                    engine::apply(&self.engine, &plaintext).map_err(|e| e.to_string())
                });
            self.cache.insert(key);

            match outcome {
                Ok(()) => {
                    debug!(
                        session_id = %self.session_id,
                        from = %message.from,
                        sequence_no = message.sequence_no,
                        "Applied protocol message"
                    );
                }
                Err(reason) => {
                    warn!(
                        session_id = %self.session_id,
                        from = %message.from,
                        hash = %message.hash,
                        error = %reason,
                        "Message puller: skipping message that failed to apply"
                    );
                    let _ = self.failures.send(ApplyFailure {
                        session_id: self.session_id.clone(),
                        party_id: self.party_id.clone(),
                        from: message.from.clone(),
                        hash: message.hash.clone(),
                        sequence_no: message.sequence_no,
                        reason,
                    });
                }
            }

            self.spawn_delete(message.hash);
        }
    }

    fn spawn_delete(&self, hash: String) {
        let mailbox = self.mailbox.clone();
        let session_id = self.session_id.clone();
        let party_id = self.party_id.clone();
        let scope = self.scope.clone();

        tokio::spawn(async move {
            if let Err(e) = mailbox
                .delete_message(&session_id, &party_id, &hash, scope.as_deref())
                .await
            {
                debug!(session_id = %session_id, hash = %hash, error = %e, "Best-effort delete failed");
            }
        });
    }
}
