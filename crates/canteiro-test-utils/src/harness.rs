// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dialogue testing.
//!
//! `TestHarness` assembles a dialogue engine with mock chat and services, a
//! manual clock and a temp SQLite database holding the contact lists.
//! `send()` drives one inbound message through the engine to completion.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use canteiro_config::model::{DialogueConfig, StorageConfig};
use canteiro_core::{
    ActivityLog, CanteiroError, ContactEntry, ContactList, InboundMessage, MessageId,
    StorageAdapter,
};
use canteiro_dialogue::{
    Backends, Conversation, ConversationRepository, DialogueEngine, EngineDeps,
    InMemoryConversations,
};
use canteiro_storage::SqliteStorage;

use crate::clock::ManualClock;
use crate::mock_backend::{GeoBehavior, MockBackend, MockGeoLocator};
use crate::mock_chat::MockChatClient;

/// Opens a migrated SQLite store in a fresh temp directory.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn temp_storage() -> Result<(TempDir, Arc<SqliteStorage>), CanteiroError> {
    let temp_dir = TempDir::new().map_err(|e| CanteiroError::Storage { source: e.into() })?;
    let db_path = temp_dir.path().join("test.db");
    let storage = SqliteStorage::new(StorageConfig {
        database_path: db_path.to_string_lossy().to_string(),
        wal_mode: true,
    });
    storage.initialize().await?;
    Ok((temp_dir, Arc::new(storage)))
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: DialogueConfig,
    geo: GeoBehavior,
    geo_timeout: Duration,
    start: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: DialogueConfig {
                location_wait_secs: 1,
                ..DialogueConfig::default()
            },
            geo: GeoBehavior::Unavailable,
            geo_timeout: Duration::from_secs(1),
            start: Utc
                .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Adjust the dialogue configuration.
    pub fn with_config(mut self, f: impl FnOnce(&mut DialogueConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Set how IP geolocation answers.
    pub fn with_geo(mut self, behavior: GeoBehavior) -> Self {
        self.geo = behavior;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CanteiroError> {
        let (temp_dir, storage) = temp_storage().await?;

        let chat = Arc::new(MockChatClient::new());
        let backend = Arc::new(MockBackend::new());
        let geo = Arc::new(MockGeoLocator::new(self.geo));
        let clock = Arc::new(ManualClock::new(self.start));
        let activity = Arc::new(ActivityLog::with_clock(
            canteiro_core::activity::DEFAULT_CAPACITY,
            clock.clone(),
        ));
        let conversations = Arc::new(InMemoryConversations::new());

        let engine = DialogueEngine::new(
            self.config,
            EngineDeps {
                chat: chat.clone(),
                storage: storage.clone(),
                conversations: conversations.clone(),
                backends: Backends {
                    clients: backend.clone(),
                    tickets: backend.clone(),
                    attendance: backend.clone(),
                    sites: backend.clone(),
                    notifications: backend.clone(),
                },
                geo: geo.clone(),
                geo_timeout: self.geo_timeout,
                activity: activity.clone(),
                clock: clock.clone(),
            },
        );

        Ok(TestHarness {
            chat,
            backend,
            geo,
            clock,
            storage,
            activity,
            conversations,
            engine: Arc::new(engine),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete dialogue stack backed by mocks.
pub struct TestHarness {
    pub chat: Arc<MockChatClient>,
    pub backend: Arc<MockBackend>,
    pub geo: Arc<MockGeoLocator>,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<SqliteStorage>,
    pub activity: Arc<ActivityLog>,
    pub conversations: Arc<InMemoryConversations>,
    pub engine: Arc<DialogueEngine>,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Chat address for a phone number.
    pub fn address(phone: &str) -> String {
        format!("{phone}@c.us")
    }

    /// Delivers a text message from `phone` and waits for the engine to finish.
    pub async fn send(&self, phone: &str, text: &str) {
        let message = InboundMessage {
            id: MessageId(format!("in-{}", uuid::Uuid::new_v4())),
            from: Self::address(phone),
            body: text.to_string(),
            timestamp: self.clock_now(),
            location: None,
        };
        self.engine.handle_message(message).await;
    }

    /// Everything the bot sent to `phone`, in order.
    pub fn replies(&self, phone: &str) -> Vec<String> {
        self.chat.sent_to(phone)
    }

    /// The most recent reply to `phone`, or an empty string.
    pub fn last_reply(&self, phone: &str) -> String {
        self.chat.last_sent_to(phone).unwrap_or_default()
    }

    pub fn conversation(&self, phone: &str) -> Option<Conversation> {
        self.conversations.get(phone)
    }

    /// Stores a contact list and returns it.
    pub async fn add_contact_list(
        &self,
        name: &str,
        can_create_tickets: bool,
        can_register_attendance: bool,
        contacts: Vec<ContactEntry>,
    ) -> Result<ContactList, CanteiroError> {
        let now = self.clock_now();
        let list = ContactList {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            can_create_tickets,
            can_register_attendance,
            contacts,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_contact_list(&list).await?;
        Ok(list)
    }

    /// A contact entry with no overrides.
    pub fn contact(name: &str, phone: &str) -> ContactEntry {
        ContactEntry {
            name: name.to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use canteiro_core::Clock;
        self.clock.now()
    }
}
