// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP calls to the WhatsApp Web bridge sidecar.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use canteiro_config::model::WhatsAppConfig;
use canteiro_core::{CanteiroError, ConnectionState, GeoPoint, MessageId};

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RegisteredResponse {
    registered: bool,
}

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(default)]
    location: Option<GeoPoint>,
}

/// Session state as reported by `GET /session`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    #[serde(default)]
    pub qr: Option<String>,
}

/// Thin typed wrapper over the bridge REST API.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, CanteiroError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.api_token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CanteiroError::Config(format!("invalid whatsapp.api_token header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CanteiroError::Chat {
                message: format!("failed to build bridge HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.bridge_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send_message(&self, to: &str, text: &str) -> Result<MessageId, CanteiroError> {
        let response = self
            .call(
                self.http
                    .post(format!("{}/messages", self.base_url))
                    .json(&SendRequest { to, text }),
            )
            .await?;
        let body: SendResponse = decode(response).await?;
        Ok(MessageId(body.id))
    }

    pub async fn is_registered(&self, phone: &str) -> Result<bool, CanteiroError> {
        let response = self
            .call(
                self.http
                    .get(format!("{}/contacts/{phone}/registered", self.base_url)),
            )
            .await?;
        let body: RegisteredResponse = decode(response).await?;
        Ok(body.registered)
    }

    pub async fn last_location(&self, phone: &str) -> Result<Option<GeoPoint>, CanteiroError> {
        let response = self
            .call(self.http.get(format!("{}/chats/{phone}/location", self.base_url)))
            .await?;
        let body: LocationResponse = decode(response).await?;
        Ok(body.location)
    }

    pub async fn session(&self) -> Result<SessionSnapshot, CanteiroError> {
        let response = self
            .call(self.http.get(format!("{}/session", self.base_url)))
            .await?;
        decode(response).await
    }

    /// Asks the bridge to tear down and relaunch its browser session.
    pub async fn restart_session(&self) -> Result<(), CanteiroError> {
        self.call(self.http.post(format!("{}/session/restart", self.base_url)))
            .await?;
        Ok(())
    }

    async fn call(&self, request: RequestBuilder) -> Result<Response, CanteiroError> {
        let response = request.send().await.map_err(|e| CanteiroError::Chat {
            message: format!("bridge request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        debug!(status = %status, url = %response.url(), "bridge response received");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CanteiroError::Chat {
            message: format!("bridge returned {status}: {body}"),
            source: None,
        })
    }
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, CanteiroError> {
    let body = response.text().await.map_err(|e| CanteiroError::Chat {
        message: format!("failed to read bridge response: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| CanteiroError::Chat {
        message: format!("failed to parse bridge response: {e}"),
        source: Some(Box::new(e)),
    })
}
