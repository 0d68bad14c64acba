// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Peer discovery over the mediator's joined-parties list.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Mailbox;

/// Delay between joined-party polls.
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(1);

/// How long a joiner waits for the initiator to publish the committee.
pub const START_TIMEOUT: Duration = Duration::from_secs(120);

/// Running peer discovery; yields each newly joined party exactly once.
pub struct PeerDiscovery {
    peers: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl PeerDiscovery {
    /// Start polling `GET /session/{id}` in the background.
    pub fn spawn<M: Mailbox>(mailbox: Arc<M>, session_id: impl Into<String>) -> Self {
        let (peers_tx, peers) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(poll_joined(
            mailbox,
            session_id.into(),
            peers_tx,
            shutdown.clone(),
        ));

        Self {
            peers,
            shutdown,
            task,
        }
    }

    /// Next newly observed party, or `None` once discovery has stopped.
    pub async fn next_peer(&mut self) -> Option<String> {
        self.peers.recv().await
    }

    /// Parties observed since the last call, without waiting.
    pub fn drain(&mut self) -> Vec<String> {
        let mut parties = Vec::new();
        while let Ok(party) = self.peers.try_recv() {
            parties.push(party);
        }
        parties
    }

    /// Stop polling and wait for the task to exit.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        let _ = (&mut self.task).await;
    }
}

impl Drop for PeerDiscovery {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn poll_joined<M: Mailbox>(
    mailbox: Arc<M>,
    session_id: String,
    peers: mpsc::UnboundedSender<String>,
    shutdown: CancellationToken,
) {
    info!(session_id = %session_id, "Peer discovery starting");
    let mut seen = HashSet::new();

    loop {
        let polled = tokio::select! {
            result = mailbox.joined_parties(&session_id) => Some(result),
            _ = shutdown.cancelled() => None,
        };

        match polled {
            None => break,
            Some(Ok(parties)) => {
                for party in parties {
                    if seen.insert(party.clone()) {
                        info!(session_id = %session_id, party_id = %party, "Discovered peer");
                        if peers.send(party).is_err() {
                            return;
                        }
                    }
                }
            }
            Some(Err(e)) => {
                warn!(session_id = %session_id, error = %e, "Joined-party poll failed, retrying");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(DISCOVERY_INTERVAL) => {},
            _ = shutdown.cancelled() => break,
        }
    }

    info!(session_id = %session_id, "Peer discovery stopped");
}

/// Wait for the initiator to publish the committee via `POST /start/{id}`.
///
/// Returns `None` if nothing is published within [`START_TIMEOUT`].
/// Transport errors are retried until then.
pub async fn await_start<M: Mailbox>(mailbox: &M, session_id: &str) -> Option<Vec<String>> {
    let poll = async {
        loop {
            match mailbox.started_committee(session_id).await {
                Ok(Some(committee)) => return committee,
                Ok(None) => {}
                Err(e) => warn!(session_id = %session_id, error = %e, "Start poll failed, retrying"),
            }
            tokio::time::sleep(DISCOVERY_INTERVAL).await;
        }
    };

    tokio::time::timeout(START_TIMEOUT, poll).await.ok()
}
