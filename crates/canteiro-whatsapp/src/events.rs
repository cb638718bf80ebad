// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook events pushed by the bridge and their signature check.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use canteiro_core::{ChatEvent, GeoPoint, InboundMessage, MessageId};

/// Header carrying `sha256=<hex>` over the raw request body.
pub const SIGNATURE_HEADER: &str = "x-bridge-signature";

/// Event as posted by the bridge to `/webhooks/whatsapp`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    Message(BridgeMessage),
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Qr {
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BridgeMessage {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub body: String,
    /// Unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl BridgeMessage {
    /// Group chats, status updates and our own echoes are not conversations.
    pub fn is_direct_chat(&self) -> bool {
        !self.from_me && self.from.ends_with("@c.us")
    }

    pub fn into_inbound(self, received_at: DateTime<Utc>) -> InboundMessage {
        let timestamp = self
            .timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(received_at);
        InboundMessage {
            id: MessageId(self.id),
            from: self.from,
            body: self.body,
            timestamp,
            location: self.location,
        }
    }
}

impl BridgeEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Ready => "ready",
            Self::Disconnected { .. } => "disconnected",
            Self::Qr { .. } => "qr",
        }
    }

    /// The lifecycle events map one to one; messages go through
    /// [`BridgeMessage::into_inbound`].
    pub fn lifecycle(&self) -> Option<ChatEvent> {
        match self {
            Self::Message(_) => None,
            Self::Ready => Some(ChatEvent::Ready),
            Self::Disconnected { reason } => Some(ChatEvent::Disconnected {
                reason: reason.clone(),
            }),
            Self::Qr { code } => Some(ChatEvent::Qr { code: code.clone() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("malformed signature: {0}")]
    Malformed(String),
    #[error("signature verification failed")]
    Mismatch,
}

/// Checks `sha256=<hex>` HMAC-SHA256 of `payload` under `secret`.
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let digest_hex = header
        .trim()
        .strip_prefix("sha256=")
        .ok_or_else(|| SignatureError::Malformed("expected sha256=<hex>".into()))?;
    if digest_hex.is_empty() {
        return Err(SignatureError::Malformed("empty digest".into()));
    }
    let expected = hex::decode(digest_hex).map_err(|e| SignatureError::Malformed(e.to_string()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Produces the header value the bridge is expected to send.
pub fn sign(payload: &[u8], secret: &str) -> Result<String, SignatureError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    mac.update(payload);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}
