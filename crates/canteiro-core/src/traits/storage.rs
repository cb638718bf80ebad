// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CanteiroError;
use crate::schedule::Schedule;
use crate::traits::adapter::PluginAdapter;
use crate::types::ContactList;

/// Adapter for storage and persistence backends.
///
/// Holds broadcast schedules and contact lists. Update and delete operations
/// on a missing id return [`CanteiroError::NotFound`].
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), CanteiroError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), CanteiroError>;

    // --- Schedule operations ---

    async fn create_schedule(&self, schedule: &Schedule) -> Result<(), CanteiroError>;

    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>, CanteiroError>;

    async fn list_schedules(&self) -> Result<Vec<Schedule>, CanteiroError>;

    async fn update_schedule(&self, schedule: &Schedule) -> Result<(), CanteiroError>;

    async fn delete_schedule(&self, id: &str) -> Result<(), CanteiroError>;

    /// Marks a scheduled firing: sets `last_fired_on` and adds `sent` to `total_sent`.
    async fn record_schedule_fired(
        &self,
        id: &str,
        fired_on: NaiveDate,
        sent: u64,
    ) -> Result<(), CanteiroError>;

    /// Adds `sent` to `total_sent` without touching `last_fired_on`.
    async fn add_schedule_sent(&self, id: &str, sent: u64) -> Result<(), CanteiroError>;

    // --- Contact list operations ---

    async fn create_contact_list(&self, list: &ContactList) -> Result<(), CanteiroError>;

    async fn get_contact_list(&self, id: &str) -> Result<Option<ContactList>, CanteiroError>;

    async fn list_contact_lists(&self) -> Result<Vec<ContactList>, CanteiroError>;

    async fn update_contact_list(&self, list: &ContactList) -> Result<(), CanteiroError>;

    async fn delete_contact_list(&self, id: &str) -> Result<(), CanteiroError>;
}
