// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat client trait for the WhatsApp session.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::CanteiroError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatEvent, ConnectionState, GeoPoint, MessageId};

/// A connected chat session able to send messages and publish inbound events.
///
/// The dialogue engine and the broadcast executor only see this contract.
/// Reconnection is the implementation's business; callers treat the client as
/// either ready or not ready.
#[async_trait]
pub trait ChatClient: PluginAdapter {
    /// Current state of the underlying session.
    fn connection_state(&self) -> ConnectionState;

    fn is_ready(&self) -> bool {
        self.connection_state() == ConnectionState::Ready
    }

    /// Subscribes to inbound messages and lifecycle events.
    ///
    /// Dropping the receiver deregisters the subscription.
    fn subscribe(&self) -> broadcast::Receiver<ChatEvent>;

    /// Sends a text message to a chat address.
    async fn send_message(&self, to: &str, text: &str) -> Result<MessageId, CanteiroError>;

    /// Returns whether the address belongs to a registered WhatsApp account.
    async fn is_registered_user(&self, address: &str) -> Result<bool, CanteiroError>;

    /// Location attached to the most recent message received from `address`, if any.
    async fn recent_location_share(
        &self,
        address: &str,
    ) -> Result<Option<GeoPoint>, CanteiroError>;

    /// Latest pairing QR code, while the session is awaiting a scan.
    async fn pairing_code(&self) -> Result<Option<String>, CanteiroError>;

    /// Tears down and re-establishes the session.
    async fn reconnect(&self) -> Result<(), CanteiroError>;
}
