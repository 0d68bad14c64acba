// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process mailbox used by relay and ceremony tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{Mailbox, ProtocolMessage, RelayError};
use crate::blockchain::KeysignSignature;

#[derive(Default)]
struct Inner {
    joined: HashMap<String, Vec<String>>,
    started: HashMap<String, Vec<String>>,
    completed: HashMap<String, Vec<String>>,
    /// (session, message id) -> published keysign signature
    signatures: HashMap<(String, String), KeysignSignature>,
    /// (session, party, scope) -> pending messages
    queues: HashMap<(String, String, String), Vec<ProtocolMessage>>,
    posted: Vec<ProtocolMessage>,
    deleted: Vec<String>,
    keep_on_delete: bool,
    failures_left: usize,
    completion_failures_left: usize,
    post_failures_left: usize,
    fetches: usize,
}

impl Inner {
    fn take_failure(&mut self) -> Result<(), RelayError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(RelayError::Request("connection refused".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryMailbox {
    inner: Mutex<Inner>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore deletes so every poll re-delivers the same messages.
    pub fn keep_on_delete(&self) {
        self.inner.lock().unwrap().keep_on_delete = true;
    }

    /// Fail the next `count` requests with a transport error.
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().unwrap().failures_left = count;
    }

    /// Fail only the next `count` protocol message posts.
    pub fn fail_message_posts(&self, count: usize) {
        self.inner.lock().unwrap().post_failures_left = count;
    }

    /// Fail only the next `count` completion posts.
    pub fn fail_completion_posts(&self, count: usize) {
        self.inner.lock().unwrap().completion_failures_left = count;
    }

    pub fn deliver(&self, session_id: &str, party_id: &str, scope: Option<&str>, message: ProtocolMessage) {
        let key = queue_key(session_id, party_id, scope);
        self.inner
            .lock()
            .unwrap()
            .queues
            .entry(key)
            .or_default()
            .push(message);
    }

    pub fn set_joined(&self, session_id: &str, parties: &[&str]) {
        self.inner.lock().unwrap().joined.insert(
            session_id.to_string(),
            parties.iter().map(|p| p.to_string()).collect(),
        );
    }

    pub fn add_completed(&self, session_id: &str, party_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .completed
            .entry(session_id.to_string())
            .or_default()
            .push(party_id.to_string());
    }

    pub fn completed(&self, session_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .completed
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn started(&self, session_id: &str) -> Option<Vec<String>> {
        self.inner.lock().unwrap().started.get(session_id).cloned()
    }

    pub fn posted(&self) -> Vec<ProtocolMessage> {
        self.inner.lock().unwrap().posted.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    pub fn fetches(&self) -> usize {
        self.inner.lock().unwrap().fetches
    }
}

fn queue_key(session_id: &str, party_id: &str, scope: Option<&str>) -> (String, String, String) {
    (
        session_id.to_string(),
        party_id.to_string(),
        scope.unwrap_or_default().to_string(),
    )
}

impl Mailbox for MemoryMailbox {
    async fn join_session(&self, session_id: &str, party_id: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        let parties = inner.joined.entry(session_id.to_string()).or_default();
        if !parties.iter().any(|p| p == party_id) {
            parties.push(party_id.to_string());
        }
        Ok(())
    }

    async fn joined_parties(&self, session_id: &str) -> Result<Vec<String>, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        Ok(inner.joined.get(session_id).cloned().unwrap_or_default())
    }

    async fn start_session(&self, session_id: &str, committee: &[String]) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        inner.started.insert(session_id.to_string(), committee.to_vec());
        Ok(())
    }

    async fn started_committee(&self, session_id: &str) -> Result<Option<Vec<String>>, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        Ok(inner.started.get(session_id).cloned())
    }

    async fn mark_complete(&self, session_id: &str, party_id: &str) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        if inner.completion_failures_left > 0 {
            inner.completion_failures_left -= 1;
            return Err(RelayError::Status {
                status: 502,
                path: format!("/complete/{session_id}"),
            });
        }
        inner
            .completed
            .entry(session_id.to_string())
            .or_default()
            .push(party_id.to_string());
        Ok(())
    }

    async fn completed_parties(&self, session_id: &str) -> Result<Vec<String>, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        Ok(inner.completed.get(session_id).cloned().unwrap_or_default())
    }

    async fn publish_keysign_signature(
        &self,
        session_id: &str,
        message_id: &str,
        signature: &KeysignSignature,
    ) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        inner.signatures.insert(
            (session_id.to_string(), message_id.to_string()),
            signature.clone(),
        );
        Ok(())
    }

    async fn keysign_signature(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<Option<KeysignSignature>, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        Ok(inner
            .signatures
            .get(&(session_id.to_string(), message_id.to_string()))
            .cloned())
    }

    async fn post_message(
        &self,
        session_id: &str,
        scope: Option<&str>,
        message: &ProtocolMessage,
    ) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        if inner.post_failures_left > 0 {
            inner.post_failures_left -= 1;
            return Err(RelayError::Status {
                status: 503,
                path: format!("/message/{session_id}"),
            });
        }
        inner.posted.push(message.clone());
        for to in &message.to {
            inner
                .queues
                .entry(queue_key(session_id, to, scope))
                .or_default()
                .push(message.clone());
        }
        Ok(())
    }

    async fn fetch_messages(
        &self,
        session_id: &str,
        party_id: &str,
        scope: Option<&str>,
    ) -> Result<Vec<ProtocolMessage>, RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetches += 1;
        inner.take_failure()?;
        Ok(inner
            .queues
            .get(&queue_key(session_id, party_id, scope))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_message(
        &self,
        session_id: &str,
        party_id: &str,
        hash: &str,
        scope: Option<&str>,
    ) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.take_failure()?;
        inner.deleted.push(hash.to_string());
        if !inner.keep_on_delete {
            if let Some(queue) = inner.queues.get_mut(&queue_key(session_id, party_id, scope)) {
                queue.retain(|m| m.hash != hash);
            }
        }
        Ok(())
    }
}
