// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the mediator relay server.
//!
//! The mediator is a dumb store-and-forward server keyed by session and
//! party. Every route returns JSON arrays; `404` means "nothing stored yet"
//! and is mapped to an empty result rather than an error.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /session/{id}` | join (body `[party]`) |
//! | `GET /session/{id}` | joined parties |
//! | `POST /start/{id}` | kick off with the selected committee |
//! | `GET /start/{id}` | selected committee |
//! | `POST /complete/{id}` | mark party complete (body `[party]`) |
//! | `GET /{id}` | completed parties |
//! | `POST /complete/{id}/keysign` | publish a keysign signature (`message_id` header) |
//! | `GET /complete/{id}/keysign` | published keysign signature (`message_id` header) |
//! | `POST /message/{session}` | store an outbound message |
//! | `GET /message/{session}/{party}` | pending inbound messages |
//! | `DELETE /message/{session}/{party}/{hash}` | ack a consumed message |

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::message::ProtocolMessage;
use super::Mailbox;
use crate::blockchain::KeysignSignature;
use crate::config::CoordinatorConfig;

/// Header used by the mediator to scope messages of parallel ceremonies
/// and to key published keysign signatures.
pub const MESSAGE_ID_HEADER: &str = "message_id";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid mediator URL: {0}")]
    InvalidUrl(String),

    #[error("Mediator request failed: {0}")]
    Request(String),

    #[error("Mediator returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Mediator response was invalid: {0}")]
    InvalidResponse(String),
}

/// Mediator relay client.
#[derive(Debug, Clone)]
pub struct MediatorClient {
    base_url: Url,
    http: Client,
}

impl MediatorClient {
    /// Create a client for the mediator at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RelayError> {
        let base_url =
            Url::parse(base_url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(RelayError::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &CoordinatorConfig) -> Result<Self, RelayError> {
        Self::new(&config.mediator_url, config.http_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RelayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request; `Ok(None)` when the mediator answers 404.
    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Option<Response>, RelayError> {
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RelayError::Status {
                status: status.as_u16(),
                path: url.path().to_string(),
            });
        }
        Ok(Some(response))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        scope: Option<&str>,
    ) -> Result<Option<T>, RelayError> {
        let mut request = self.http.get(url.clone());
        if let Some(scope) = scope {
            request = request.header(MESSAGE_ID_HEADER, scope);
        }

        match self.send(request, &url).await? {
            Some(response) => response
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| RelayError::InvalidResponse(e.to_string())),
            None => Ok(None),
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), RelayError> {
        self.post_scoped_json(url, body, None).await
    }

    async fn post_scoped_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        scope: Option<&str>,
    ) -> Result<(), RelayError> {
        let mut request = self.http.post(url.clone()).json(body);
        if let Some(scope) = scope {
            request = request.header(MESSAGE_ID_HEADER, scope);
        }
        match self.send(request, &url).await? {
            Some(_) => Ok(()),
            None => Err(RelayError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                path: url.path().to_string(),
            }),
        }
    }
}

impl Mailbox for MediatorClient {
    async fn join_session(&self, session_id: &str, party_id: &str) -> Result<(), RelayError> {
        let url = self.endpoint(&["session", session_id])?;
        self.post_json(url, &[party_id]).await
    }

    async fn joined_parties(&self, session_id: &str) -> Result<Vec<String>, RelayError> {
        let url = self.endpoint(&["session", session_id])?;
        Ok(self.get_json(url, None).await?.unwrap_or_default())
    }

    async fn start_session(&self, session_id: &str, committee: &[String]) -> Result<(), RelayError> {
        let url = self.endpoint(&["start", session_id])?;
        self.post_json(url, committee).await
    }

    async fn started_committee(&self, session_id: &str) -> Result<Option<Vec<String>>, RelayError> {
        let url = self.endpoint(&["start", session_id])?;
        let committee: Option<Vec<String>> = self.get_json(url, None).await?;
        Ok(committee.filter(|parties| !parties.is_empty()))
    }

    async fn mark_complete(&self, session_id: &str, party_id: &str) -> Result<(), RelayError> {
        let url = self.endpoint(&["complete", session_id])?;
        self.post_json(url, &[party_id]).await
    }

    async fn completed_parties(&self, session_id: &str) -> Result<Vec<String>, RelayError> {
        let url = self.endpoint(&[session_id])?;
        Ok(self.get_json(url, None).await?.unwrap_or_default())
    }

    async fn publish_keysign_signature(
        &self,
        session_id: &str,
        message_id: &str,
        signature: &KeysignSignature,
    ) -> Result<(), RelayError> {
        let url = self.endpoint(&["complete", session_id, "keysign"])?;
        self.post_scoped_json(url, signature, Some(message_id)).await
    }

    async fn keysign_signature(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<Option<KeysignSignature>, RelayError> {
        let url = self.endpoint(&["complete", session_id, "keysign"])?;
        self.get_json(url, Some(message_id)).await
    }

    async fn post_message(
        &self,
        session_id: &str,
        scope: Option<&str>,
        message: &ProtocolMessage,
    ) -> Result<(), RelayError> {
        let url = self.endpoint(&["message", session_id])?;
        self.post_scoped_json(url, message, scope).await
    }

    async fn fetch_messages(
        &self,
        session_id: &str,
        party_id: &str,
        scope: Option<&str>,
    ) -> Result<Vec<ProtocolMessage>, RelayError> {
        let url = self.endpoint(&["message", session_id, party_id])?;
        Ok(self.get_json(url, scope).await?.unwrap_or_default())
    }

    async fn delete_message(
        &self,
        session_id: &str,
        party_id: &str,
        hash: &str,
        scope: Option<&str>,
    ) -> Result<(), RelayError> {
        let url = self.endpoint(&["message", session_id, party_id, hash])?;
        let mut request = self.http.delete(url.clone());
        if let Some(scope) = scope {
            request = request.header(MESSAGE_ID_HEADER, scope);
        }
        // Already gone is as good as deleted.
        self.send(request, &url).await?;
        Ok(())
    }
}
