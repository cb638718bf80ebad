// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp adapter for the Canteiro bot.
//!
//! The WhatsApp Web session itself runs in a bridge sidecar. This crate talks
//! to it over HTTP for outbound calls and receives inbound traffic as signed
//! webhook events, which [`WhatsAppBridge::ingest`] turns into [`ChatEvent`]s
//! for the dialogue engine. Connection state lives in a `watch` channel so
//! readiness checks never block; [`WhatsAppBridge::supervise`] restarts the
//! session after recoverable disconnects.

pub mod client;
pub mod events;
pub mod reconnect;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use canteiro_config::model::WhatsAppConfig;
use canteiro_core::{
    AdapterType, CanteiroError, ChatClient, ChatEvent, ConnectionState, GeoPoint, HealthStatus,
    MessageId, PluginAdapter, normalize_phone,
};

pub use client::{BridgeClient, SessionSnapshot};
pub use events::{
    BridgeEvent, BridgeMessage, SIGNATURE_HEADER, SignatureError, sign, verify_signature,
};
pub use reconnect::{ReconnectPolicy, is_recoverable};

const EVENT_CAPACITY: usize = 256;

/// Why an incoming webhook was refused.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("invalid webhook payload: {0}")]
    Payload(String),
}

pub struct WhatsAppBridge {
    client: BridgeClient,
    policy: ReconnectPolicy,
    webhook_secret: Option<String>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ChatEvent>,
    qr: Mutex<Option<String>>,
    /// Location of the latest message per phone; `None` when that message had none.
    locations: DashMap<String, Option<GeoPoint>>,
}

impl WhatsAppBridge {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, CanteiroError> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            client: BridgeClient::new(config)?,
            policy: ReconnectPolicy::from_config(config),
            webhook_secret: config.webhook_secret.clone().filter(|s| !s.is_empty()),
            state: watch::Sender::new(ConnectionState::Connecting),
            events,
            qr: Mutex::new(None),
            locations: DashMap::new(),
        })
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Pulls the current session state from the bridge.
    pub async fn sync_session(&self) -> Result<ConnectionState, CanteiroError> {
        let snapshot = self.client.session().await?;
        *self.qr_slot() = snapshot.qr;
        self.set_state(snapshot.state);
        Ok(snapshot.state)
    }

    /// Verifies and applies a raw webhook body.
    pub fn accept_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), WebhookError> {
        if let Some(secret) = self.webhook_secret.as_deref() {
            verify_signature(body, signature, secret)?;
        }
        let event: BridgeEvent =
            serde_json::from_slice(body).map_err(|e| WebhookError::Payload(e.to_string()))?;
        self.ingest(event);
        Ok(())
    }

    /// Applies one bridge event and republishes it to subscribers.
    pub fn ingest(&self, event: BridgeEvent) {
        debug!(kind = event.kind(), "bridge event received");
        match event {
            BridgeEvent::Message(message) => {
                if !message.is_direct_chat() {
                    debug!(from = %message.from, "ignoring non-direct message");
                    return;
                }
                self.locations
                    .insert(normalize_phone(&message.from), message.location);
                self.publish(ChatEvent::Message(message.into_inbound(Utc::now())));
            }
            BridgeEvent::Ready => {
                *self.qr_slot() = None;
                self.set_state(ConnectionState::Ready);
                self.publish(ChatEvent::Ready);
            }
            BridgeEvent::Disconnected { reason } => {
                warn!(reason = %reason, "whatsapp session disconnected");
                self.set_state(ConnectionState::Disconnected);
                self.publish(ChatEvent::Disconnected { reason });
            }
            BridgeEvent::Qr { code } => {
                info!("whatsapp session awaiting QR pairing");
                *self.qr_slot() = Some(code.clone());
                self.set_state(ConnectionState::AwaitingQr);
                self.publish(ChatEvent::Qr { code });
            }
        }
    }

    /// Restarts the session after recoverable disconnects until `cancel` fires.
    pub async fn supervise(&self, cancel: CancellationToken) {
        let mut rx = self.events.subscribe();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Ok(ChatEvent::Disconnected { reason }) => {
                        if !is_recoverable(&reason) {
                            warn!(reason = %reason, "session logged out, a new QR pairing is required");
                            continue;
                        }
                        self.recover(&reason, &cancel).await;
                        // Drop events queued while recovering.
                        rx = rx.resubscribe();
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session supervisor lagged behind bridge events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("session supervisor stopped");
    }

    async fn recover(&self, reason: &str, cancel: &CancellationToken) -> bool {
        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, reason, "reconnecting whatsapp session");
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }
            if self.is_ready() {
                info!("whatsapp session came back on its own");
                return true;
            }
            match self.reconnect().await {
                Ok(()) => {
                    info!(attempt, "whatsapp session reconnected");
                    return true;
                }
                Err(e) => warn!(attempt, error = %e, "reconnect attempt failed"),
            }
        }
        error!(
            attempts = self.policy.max_attempts,
            "giving up on whatsapp session, restart it manually"
        );
        self.set_state(ConnectionState::Disconnected);
        false
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "whatsapp connection state changed");
        }
    }

    fn publish(&self, event: ChatEvent) {
        // No subscriber is fine before the bot loop starts.
        let _ = self.events.send(event);
    }

    fn qr_slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.qr.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppBridge {
    fn name(&self) -> &str {
        "whatsapp-bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, CanteiroError> {
        match self.client.session().await {
            Ok(snapshot) if snapshot.state == ConnectionState::Ready => Ok(HealthStatus::Healthy),
            Ok(snapshot) => Ok(HealthStatus::Degraded(format!(
                "whatsapp session is {}",
                snapshot.state
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("bridge unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), CanteiroError> {
        debug!("whatsapp bridge shutting down");
        Ok(())
    }
}

#[async_trait]
impl ChatClient for WhatsAppBridge {
    fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<MessageId, CanteiroError> {
        if !self.is_ready() {
            return Err(CanteiroError::ClientNotReady);
        }
        self.client.send_message(to, text).await
    }

    async fn is_registered_user(&self, address: &str) -> Result<bool, CanteiroError> {
        if !self.is_ready() {
            return Err(CanteiroError::ClientNotReady);
        }
        self.client.is_registered(&normalize_phone(address)).await
    }

    async fn recent_location_share(
        &self,
        address: &str,
    ) -> Result<Option<GeoPoint>, CanteiroError> {
        let phone = normalize_phone(address);
        if let Some(known) = self.locations.get(&phone) {
            return Ok(*known);
        }
        self.client.last_location(&phone).await
    }

    async fn pairing_code(&self) -> Result<Option<String>, CanteiroError> {
        Ok(self.qr_slot().clone())
    }

    async fn reconnect(&self) -> Result<(), CanteiroError> {
        let mut state = self.state.subscribe();
        self.set_state(ConnectionState::Connecting);
        self.client.restart_session().await?;

        let timeout = self.policy.restart_timeout;
        match tokio::time::timeout(timeout, state.wait_for(|s| *s == ConnectionState::Ready)).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CanteiroError::Chat {
                message: "connection state channel closed".into(),
                source: None,
            }),
            Err(_) => Err(CanteiroError::Timeout { duration: timeout }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> WhatsAppBridge {
        WhatsAppBridge::new(&WhatsAppConfig {
            bridge_url: "http://127.0.0.1:9".into(),
            ..WhatsAppConfig::default()
        })
        .unwrap()
    }

    fn message(from: &str, body: &str, location: Option<GeoPoint>) -> BridgeEvent {
        BridgeEvent::Message(BridgeMessage {
            id: "m".into(),
            from: from.into(),
            body: body.into(),
            timestamp: None,
            from_me: false,
            location,
        })
    }

    #[test]
    fn starts_connecting() {
        assert_eq!(bridge().connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn lifecycle_events_drive_state_and_qr() {
        let b = bridge();
        let mut rx = b.subscribe();

        b.ingest(BridgeEvent::Qr { code: "2@abc".into() });
        assert_eq!(b.connection_state(), ConnectionState::AwaitingQr);
        assert_eq!(*b.qr_slot(), Some("2@abc".to_string()));

        b.ingest(BridgeEvent::Ready);
        assert!(b.is_ready());
        assert_eq!(*b.qr_slot(), None);

        b.ingest(BridgeEvent::Disconnected {
            reason: "NAVIGATION".into(),
        });
        assert_eq!(b.connection_state(), ConnectionState::Disconnected);

        assert!(matches!(rx.try_recv(), Ok(ChatEvent::Qr { .. })));
        assert!(matches!(rx.try_recv(), Ok(ChatEvent::Ready)));
        assert!(matches!(rx.try_recv(), Ok(ChatEvent::Disconnected { .. })));
    }

    #[tokio::test]
    async fn latest_message_decides_the_cached_location() {
        let b = bridge();
        b.ingest(message(
            "351911111111@c.us",
            "",
            Some(GeoPoint::new(41.1, -8.6)),
        ));
        assert_eq!(
            b.recent_location_share("351911111111@c.us").await.unwrap(),
            Some(GeoPoint::new(41.1, -8.6))
        );

        b.ingest(message("351911111111@c.us", "ponto", None));
        assert_eq!(b.recent_location_share("351911111111").await.unwrap(), None);
    }

    #[test]
    fn group_messages_are_dropped() {
        let b = bridge();
        let mut rx = b.subscribe();
        b.ingest(message("1203630@g.us", "pedido", None));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sending_requires_a_ready_session() {
        let b = bridge();
        assert!(matches!(
            b.send_message("351911111111@c.us", "x").await,
            Err(CanteiroError::ClientNotReady)
        ));
        assert!(matches!(
            b.is_registered_user("351911111111@c.us").await,
            Err(CanteiroError::ClientNotReady)
        ));
    }

    #[test]
    fn unsigned_webhook_is_rejected_when_secret_is_set() {
        let b = WhatsAppBridge::new(&WhatsAppConfig {
            webhook_secret: Some("segredo".into()),
            ..WhatsAppConfig::default()
        })
        .unwrap();
        let body = br#"{"type":"ready"}"#;
        assert!(matches!(
            b.accept_webhook(body, None),
            Err(WebhookError::Signature(SignatureError::Missing))
        ));
        let signature = events::sign(body, "segredo").unwrap();
        b.accept_webhook(body, Some(&signature)).unwrap();
        assert!(b.is_ready());
    }

    #[test]
    fn bad_payload_is_rejected() {
        let b = bridge();
        assert!(matches!(
            b.accept_webhook(b"not json", None),
            Err(WebhookError::Payload(_))
        ));
    }
}
