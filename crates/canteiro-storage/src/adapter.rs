// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::debug;

use canteiro_config::model::StorageConfig;
use canteiro_core::{
    AdapterType, CanteiroError, ContactList, HealthStatus, PluginAdapter, Schedule,
    StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, CanteiroError> {
        self.db.get().ok_or_else(|| CanteiroError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), CanteiroError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, CanteiroError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CanteiroError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), CanteiroError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CanteiroError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), CanteiroError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Schedule operations ---

    async fn create_schedule(&self, schedule: &Schedule) -> Result<(), CanteiroError> {
        queries::schedules::create_schedule(self.db()?, schedule).await
    }

    async fn get_schedule(&self, id: &str) -> Result<Option<Schedule>, CanteiroError> {
        queries::schedules::get_schedule(self.db()?, id).await
    }

    async fn list_schedules(&self) -> Result<Vec<Schedule>, CanteiroError> {
        queries::schedules::list_schedules(self.db()?).await
    }

    async fn update_schedule(&self, schedule: &Schedule) -> Result<(), CanteiroError> {
        queries::schedules::update_schedule(self.db()?, schedule).await
    }

    async fn delete_schedule(&self, id: &str) -> Result<(), CanteiroError> {
        queries::schedules::delete_schedule(self.db()?, id).await
    }

    async fn record_schedule_fired(
        &self,
        id: &str,
        fired_on: NaiveDate,
        sent: u64,
    ) -> Result<(), CanteiroError> {
        queries::schedules::record_fired(self.db()?, id, fired_on, sent).await
    }

    async fn add_schedule_sent(&self, id: &str, sent: u64) -> Result<(), CanteiroError> {
        queries::schedules::add_sent(self.db()?, id, sent).await
    }

    // --- Contact list operations ---

    async fn create_contact_list(&self, list: &ContactList) -> Result<(), CanteiroError> {
        queries::contact_lists::create_contact_list(self.db()?, list).await
    }

    async fn get_contact_list(&self, id: &str) -> Result<Option<ContactList>, CanteiroError> {
        queries::contact_lists::get_contact_list(self.db()?, id).await
    }

    async fn list_contact_lists(&self) -> Result<Vec<ContactList>, CanteiroError> {
        queries::contact_lists::list_contact_lists(self.db()?).await
    }

    async fn update_contact_list(&self, list: &ContactList) -> Result<(), CanteiroError> {
        queries::contact_lists::update_contact_list(self.db()?, list).await
    }

    async fn delete_contact_list(&self, id: &str) -> Result<(), CanteiroError> {
        queries::contact_lists::delete_contact_list(self.db()?, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteiro_core::{BroadcastPriority, FireTime, Frequency};
    use chrono::Utc;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    fn daily(id: &str) -> Schedule {
        let now = Utc::now();
        Schedule {
            id: id.into(),
            name: "Bom dia".into(),
            message: "Bom dia equipa".into(),
            recipients: vec![],
            frequency: Frequency::Daily,
            fire_time: FireTime::new(8, 0).unwrap(),
            active_days: vec![],
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            enabled: true,
            priority: BroadcastPriority::Normal,
            last_fired_on: None,
            total_sent: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let storage = SqliteStorage::new(make_config("never.db"));
        assert!(storage.health_check().await.is_err());
        assert!(storage.list_schedules().await.is_err());
    }

    #[tokio::test]
    async fn schedule_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        storage.create_schedule(&daily("d1")).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        storage.record_schedule_fired("d1", today, 4).await.unwrap();

        let loaded = storage.get_schedule("d1").await.unwrap().unwrap();
        assert_eq!(loaded.last_fired_on, Some(today));
        assert_eq!(loaded.total_sent, 4);

        storage.delete_schedule("d1").await.unwrap();
        assert!(storage.list_schedules().await.unwrap().is_empty());

        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("persist.db");
        let path = db_path.to_str().unwrap();

        let storage = SqliteStorage::new(make_config(path));
        storage.initialize().await.unwrap();
        storage.create_schedule(&daily("keep")).await.unwrap();
        storage.shutdown().await.unwrap();
        drop(storage);

        let reopened = SqliteStorage::new(make_config(path));
        reopened.initialize().await.unwrap();
        assert!(reopened.get_schedule("keep").await.unwrap().is_some());
    }
}
