// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat client for deterministic testing.
//!
//! `MockChatClient` implements `ChatClient` with injectable inbound events and
//! captured outbound messages for assertion in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use canteiro_core::normalize_phone as digits;
use canteiro_core::{
    AdapterType, CanteiroError, ChatClient, ChatEvent, ConnectionState, GeoPoint, HealthStatus,
    InboundMessage, MessageId, PluginAdapter,
};

use crate::lock;

/// One message passed to `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub text: String,
}

pub struct MockChatClient {
    state: Mutex<ConnectionState>,
    events: broadcast::Sender<ChatEvent>,
    sent: Mutex<Vec<SentMessage>>,
    unregistered: Mutex<HashSet<String>>,
    failing: Mutex<HashSet<String>>,
    shared_locations: Mutex<HashMap<String, GeoPoint>>,
    live_replies: Mutex<HashMap<String, GeoPoint>>,
    pairing_code: Mutex<Option<String>>,
    reconnects: Mutex<u32>,
}

impl MockChatClient {
    /// A connected client with no registered-user restrictions.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(ConnectionState::Ready),
            events,
            sent: Mutex::new(Vec::new()),
            unregistered: Mutex::new(HashSet::new()),
            failing: Mutex::new(HashSet::new()),
            shared_locations: Mutex::new(HashMap::new()),
            live_replies: Mutex::new(HashMap::new()),
            pairing_code: Mutex::new(None),
            reconnects: Mutex::new(0),
        }
    }

    /// Publishes a text message from `from`.
    pub fn inject_text(&self, from: &str, body: &str) {
        self.inject(ChatEvent::Message(InboundMessage {
            id: MessageId(format!("in-{}", uuid::Uuid::new_v4())),
            from: from.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
            location: None,
        }));
    }

    pub fn inject(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }

    /// Changes the connection state and publishes the matching event.
    pub fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
        match state {
            ConnectionState::Ready => self.inject(ChatEvent::Ready),
            ConnectionState::Disconnected => self.inject(ChatEvent::Disconnected {
                reason: "test".into(),
            }),
            ConnectionState::Connecting | ConnectionState::AwaitingQr => {}
        }
    }

    /// Makes `is_registered_user` return false for `phone`.
    pub fn mark_unregistered(&self, phone: &str) {
        lock(&self.unregistered).insert(digits(phone));
    }

    /// Makes `send_message` to `phone` fail.
    pub fn fail_sends_to(&self, phone: &str) {
        lock(&self.failing).insert(digits(phone));
    }

    /// Sets the answer of `recent_location_share` for `phone`.
    pub fn set_shared_location(&self, phone: &str, point: GeoPoint) {
        lock(&self.shared_locations).insert(digits(phone), point);
    }

    /// The next time anything is sent to `phone`, answer with a live location share.
    pub fn share_location_after_next_reply(&self, phone: &str, point: GeoPoint) {
        lock(&self.live_replies).insert(digits(phone), point);
    }

    pub fn set_pairing_code(&self, code: Option<&str>) {
        *lock(&self.pairing_code) = code.map(str::to_string);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    /// Texts sent to `phone`, in order.
    pub fn sent_to(&self, phone: &str) -> Vec<String> {
        let phone = digits(phone);
        lock(&self.sent)
            .iter()
            .filter(|m| digits(&m.to) == phone)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last_sent_to(&self, phone: &str) -> Option<String> {
        self.sent_to(phone).pop()
    }

    pub fn sent_count(&self) -> usize {
        lock(&self.sent).len()
    }

    pub fn clear_sent(&self) {
        lock(&self.sent).clear();
    }

    pub fn reconnect_count(&self) -> u32 {
        *lock(&self.reconnects)
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChatClient {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, CanteiroError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CanteiroError> {
        Ok(())
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    fn connection_state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<MessageId, CanteiroError> {
        if !self.is_ready() {
            return Err(CanteiroError::ClientNotReady);
        }
        let phone = digits(to);
        if lock(&self.failing).contains(&phone) {
            return Err(CanteiroError::Chat {
                message: format!("send to {to} failed"),
                source: None,
            });
        }

        lock(&self.sent).push(SentMessage {
            to: to.to_string(),
            text: text.to_string(),
        });

        let live = lock(&self.live_replies).remove(&phone);
        if let Some(point) = live {
            self.inject(ChatEvent::Message(InboundMessage {
                id: MessageId(format!("loc-{}", uuid::Uuid::new_v4())),
                from: to.to_string(),
                body: String::new(),
                timestamp: Utc::now(),
                location: Some(point),
            }));
        }

        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }

    async fn is_registered_user(&self, address: &str) -> Result<bool, CanteiroError> {
        if !self.is_ready() {
            return Err(CanteiroError::ClientNotReady);
        }
        Ok(!lock(&self.unregistered).contains(&digits(address)))
    }

    async fn recent_location_share(
        &self,
        address: &str,
    ) -> Result<Option<GeoPoint>, CanteiroError> {
        Ok(lock(&self.shared_locations).get(&digits(address)).copied())
    }

    async fn pairing_code(&self) -> Result<Option<String>, CanteiroError> {
        Ok(lock(&self.pairing_code).clone())
    }

    async fn reconnect(&self) -> Result<(), CanteiroError> {
        *lock(&self.reconnects) += 1;
        self.set_state(ConnectionState::Ready);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_captures_messages() {
        let chat = MockChatClient::new();
        chat.send_message("351912345678@c.us", "olá").await.unwrap();
        assert_eq!(chat.sent_to("912345678").len(), 0);
        assert_eq!(chat.sent_to("351912345678"), vec!["olá".to_string()]);
        assert_eq!(chat.sent_count(), 1);
    }

    #[tokio::test]
    async fn not_ready_rejects_sends() {
        let chat = MockChatClient::new();
        chat.set_state(ConnectionState::Disconnected);
        assert!(matches!(
            chat.send_message("1", "x").await,
            Err(CanteiroError::ClientNotReady)
        ));
    }

    #[tokio::test]
    async fn injected_events_reach_subscribers() {
        let chat = MockChatClient::new();
        let mut rx = chat.subscribe();
        chat.inject_text("351911111111@c.us", "ponto");
        match rx.recv().await.unwrap() {
            ChatEvent::Message(m) => assert_eq!(m.body, "ponto"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn live_reply_is_emitted_once() {
        let chat = MockChatClient::new();
        let mut rx = chat.subscribe();
        chat.share_location_after_next_reply("351911111111", GeoPoint::new(41.1, -8.6));
        chat.send_message("351911111111@c.us", "partilhe").await.unwrap();
        chat.send_message("351911111111@c.us", "outra").await.unwrap();

        match rx.recv().await.unwrap() {
            ChatEvent::Message(m) => assert_eq!(m.location, Some(GeoPoint::new(41.1, -8.6))),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregistered_numbers() {
        let chat = MockChatClient::new();
        chat.mark_unregistered("+351 922 222 222");
        assert!(!chat.is_registered_user("351922222222@c.us").await.unwrap());
        assert!(chat.is_registered_user("351933333333@c.us").await.unwrap());
    }
}
