// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Completion reporting and quorum polling.
//!
//! A device that finishes its local rounds reports itself complete, then
//! waits for every committee member to do the same. The wait is bounded so a
//! peer that drops offline cannot hang the ceremony.
//!
//! Keysign devices also publish each signature they produce. A device whose
//! engine failed on a message can then pick up a peer's signature instead of
//! re-running the ceremony.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::crypto::body_hash;
use super::{Mailbox, RelayError};
use crate::blockchain::KeysignSignature;

/// Hard bound on waiting for the committee to complete.
pub const QUORUM_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between completed-party polls and between completion retries.
pub const QUORUM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lookups of a peer's published signature before giving up.
pub const SIGNATURE_LOOKUP_ATTEMPTS: usize = 3;

/// Mediator key for the signature over one keysign message.
pub fn keysign_message_id(message: &str) -> String {
    body_hash(message.trim_start_matches("0x").as_bytes())
}

/// True when every committee member appears in `completed`.
pub fn is_quorum(committee: &[String], completed: &[String]) -> bool {
    let completed: HashSet<&str> = completed.iter().map(String::as_str).collect();
    committee.iter().all(|party| completed.contains(party.as_str()))
}

pub struct QuorumVerifier<M: Mailbox> {
    mailbox: Arc<M>,
    session_id: String,
    local_party_id: String,
    committee: Vec<String>,
}

impl<M: Mailbox> QuorumVerifier<M> {
    pub fn new(
        mailbox: Arc<M>,
        session_id: impl Into<String>,
        local_party_id: impl Into<String>,
        committee: Vec<String>,
    ) -> Self {
        Self {
            mailbox,
            session_id: session_id.into(),
            local_party_id: local_party_id.into(),
            committee,
        }
    }

    /// Report the local party as complete in the background.
    ///
    /// The post is retried every [`QUORUM_POLL_INTERVAL`] until it succeeds
    /// or [`QUORUM_TIMEOUT`] has passed. The task yields `true` once the
    /// mediator accepted it.
    pub fn mark_local_complete(&self) -> JoinHandle<bool> {
        let mailbox = self.mailbox.clone();
        let session_id = self.session_id.clone();
        let party_id = self.local_party_id.clone();
        let deadline = Instant::now() + QUORUM_TIMEOUT;

        tokio::spawn(async move {
            let mut attempt = 1;
            loop {
                match mailbox.mark_complete(&session_id, &party_id).await {
                    Ok(()) => {
                        info!(
                            session_id = %session_id,
                            party_id = %party_id,
                            attempt,
                            "Marked local party complete"
                        );
                        return true;
                    }
                    Err(e) if Instant::now() + QUORUM_POLL_INTERVAL < deadline => {
                        warn!(
                            session_id = %session_id,
                            party_id = %party_id,
                            attempt,
                            error = %e,
                            "Failed to mark local party complete, retrying"
                        );
                        attempt += 1;
                        tokio::time::sleep(QUORUM_POLL_INTERVAL).await;
                    }
                    Err(e) => {
                        warn!(
                            session_id = %session_id,
                            party_id = %party_id,
                            attempt,
                            error = %e,
                            "Giving up marking local party complete"
                        );
                        return false;
                    }
                }
            }
        })
    }

    /// Publish the local signature over `message` for peers to recover.
    pub async fn mark_keysign_complete(
        &self,
        message: &str,
        signature: &KeysignSignature,
    ) -> Result<(), RelayError> {
        let message_id = keysign_message_id(message);
        self.mailbox
            .publish_keysign_signature(&self.session_id, &message_id, signature)
            .await?;
        debug!(
            session_id = %self.session_id,
            message_id = %message_id,
            "Published keysign signature"
        );
        Ok(())
    }

    /// Signature a peer published over `message`, looked up at most
    /// [`SIGNATURE_LOOKUP_ATTEMPTS`] times.
    pub async fn check_keysign_complete(&self, message: &str) -> Option<KeysignSignature> {
        let message_id = keysign_message_id(message);
        let expected = message.trim_start_matches("0x");

        for attempt in 1..=SIGNATURE_LOOKUP_ATTEMPTS {
            match self
                .mailbox
                .keysign_signature(&self.session_id, &message_id)
                .await
            {
                Ok(Some(signature))
                    if signature.msg.trim_start_matches("0x").eq_ignore_ascii_case(expected) =>
                {
                    info!(
                        session_id = %self.session_id,
                        message_id = %message_id,
                        attempt,
                        "Recovered keysign signature from a peer"
                    );
                    return Some(signature);
                }
                Ok(Some(signature)) => warn!(
                    session_id = %self.session_id,
                    message_id = %message_id,
                    signed = %signature.msg,
                    "Published signature is for another message"
                ),
                Ok(None) => debug!(
                    session_id = %self.session_id,
                    message_id = %message_id,
                    attempt,
                    "No keysign signature published yet"
                ),
                Err(e) => warn!(
                    session_id = %self.session_id,
                    message_id = %message_id,
                    attempt,
                    error = %e,
                    "Keysign signature lookup failed"
                ),
            }
            if attempt < SIGNATURE_LOOKUP_ATTEMPTS {
                tokio::time::sleep(QUORUM_POLL_INTERVAL).await;
            }
        }
        None
    }

    /// Poll until the whole committee has completed.
    ///
    /// Returns `false` if that does not happen within [`QUORUM_TIMEOUT`].
    pub async fn await_quorum(&self) -> bool {
        let reached = tokio::time::timeout(QUORUM_TIMEOUT, self.poll_until_quorum())
            .await
            .is_ok();

        if reached {
            info!(session_id = %self.session_id, committee = ?self.committee, "Quorum reached");
        } else {
            warn!(
                session_id = %self.session_id,
                timeout_secs = QUORUM_TIMEOUT.as_secs(),
                "Quorum not reached before timeout"
            );
        }
        reached
    }

    async fn poll_until_quorum(&self) {
        loop {
            match self.mailbox.completed_parties(&self.session_id).await {
                Ok(completed) if is_quorum(&self.committee, &completed) => return,
                Ok(_) => {}
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Completed-party poll failed");
                }
            }
            tokio::time::sleep(QUORUM_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::relay::memory::MemoryMailbox;

    fn committee() -> Vec<String> {
        vec!["iphone-A1".to_string(), "mac-B2".to_string()]
    }

    #[test]
    fn quorum_requires_every_member() {
        let committee = committee();
        assert!(!is_quorum(&committee, &["iphone-A1".to_string()]));
        assert!(is_quorum(
            &committee,
            &[
                "mac-B2".to_string(),
                "ipad-C3".to_string(),
                "iphone-A1".to_string()
            ]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_true_once_committee_completes() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let verifier = QuorumVerifier::new(mailbox.clone(), "s1", "iphone-A1", committee());

        assert!(verifier.mark_local_complete().await.unwrap());
        assert_eq!(mailbox.completed("s1"), vec!["iphone-A1".to_string()]);

        let peer = mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            peer.add_completed("s1", "mac-B2");
        });

        let started = Instant::now();
        assert!(verifier.await_quorum().await);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(5) + QUORUM_POLL_INTERVAL + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_false_after_timeout() {
        let mailbox = Arc::new(MemoryMailbox::new());
        mailbox.add_completed("s1", "iphone-A1");
        let verifier = QuorumVerifier::new(mailbox, "s1", "iphone-A1", committee());

        let started = Instant::now();
        assert!(!verifier.await_quorum().await);
        let elapsed = started.elapsed();
        assert!(elapsed >= QUORUM_TIMEOUT);
        assert!(elapsed < QUORUM_TIMEOUT + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let mailbox = Arc::new(MemoryMailbox::new());
        mailbox.add_completed("s1", "iphone-A1");
        mailbox.add_completed("s1", "mac-B2");
        mailbox.fail_next(3);
        let verifier = QuorumVerifier::new(mailbox, "s1", "iphone-A1", committee());

        assert!(verifier.await_quorum().await);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_completion_post_is_retried() {
        let mailbox = Arc::new(MemoryMailbox::new());
        mailbox.fail_completion_posts(1);
        let verifier = QuorumVerifier::new(mailbox.clone(), "s1", "iphone-A1", committee());

        let started = Instant::now();
        assert!(verifier.mark_local_complete().await.unwrap());
        assert_eq!(mailbox.completed("s1"), vec!["iphone-A1".to_string()]);
        assert!(started.elapsed() >= QUORUM_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_retries_stop_at_the_quorum_deadline() {
        let mailbox = Arc::new(MemoryMailbox::new());
        mailbox.fail_completion_posts(usize::MAX);
        let verifier = QuorumVerifier::new(mailbox.clone(), "s1", "iphone-A1", committee());

        let started = Instant::now();
        assert!(!verifier.mark_local_complete().await.unwrap());
        assert!(started.elapsed() < QUORUM_TIMEOUT);
        assert!(started.elapsed() >= QUORUM_TIMEOUT - 2 * QUORUM_POLL_INTERVAL);
        assert!(mailbox.completed("s1").is_empty());
    }

    fn signature(msg: &str) -> KeysignSignature {
        KeysignSignature {
            msg: msg.to_string(),
            r: "01".repeat(32),
            s: "02".repeat(32),
            der_signature: String::new(),
            recovery_id: 0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn peer_signature_is_recovered() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let message = "1e93ef6b20b01723e95128aed8786d43c7c53a12959a21ef36cf408a6d7115de";
        let signer = QuorumVerifier::new(mailbox.clone(), "s1", "mac-B2", committee());
        let failed = QuorumVerifier::new(mailbox.clone(), "s1", "iphone-A1", committee());

        signer
            .mark_keysign_complete(message, &signature(message))
            .await
            .unwrap();
        assert_eq!(
            failed.check_keysign_complete(&format!("0x{message}")).await,
            Some(signature(message))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn signature_lookup_gives_up_after_three_attempts() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let verifier = QuorumVerifier::new(mailbox.clone(), "s1", "iphone-A1", committee());

        let started = Instant::now();
        assert_eq!(verifier.check_keysign_complete("abcd").await, None);
        assert_eq!(
            started.elapsed(),
            QUORUM_POLL_INTERVAL * (SIGNATURE_LOOKUP_ATTEMPTS as u32 - 1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn signature_published_late_is_still_found() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let verifier = QuorumVerifier::new(mailbox.clone(), "s1", "iphone-A1", committee());
        mailbox.fail_next(1);

        let peer = QuorumVerifier::new(mailbox.clone(), "s1", "mac-B2", committee());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            peer.mark_keysign_complete("abcd", &signature("abcd"))
                .await
                .unwrap();
        });

        assert_eq!(
            verifier.check_keysign_complete("abcd").await,
            Some(signature("abcd"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn signature_for_another_message_is_ignored() {
        let mailbox = Arc::new(MemoryMailbox::new());
        let message_id = keysign_message_id("abcd");
        mailbox
            .publish_keysign_signature("s1", &message_id, &signature("ffff"))
            .await
            .unwrap();

        let verifier = QuorumVerifier::new(mailbox, "s1", "iphone-A1", committee());
        assert_eq!(verifier.check_keysign_complete("abcd").await, None);
    }
}
