// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use canteiro_core::CanteiroError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs and run migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, CanteiroError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CanteiroError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CanteiroError::Storage {
                source: Box::new(e),
            })?;
        Self::setup(conn, wal_mode).await
    }

    /// In-memory database with the full schema, for tests.
    pub async fn open_in_memory() -> Result<Self, CanteiroError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| CanteiroError::Storage {
                source: Box::new(e),
            })?;
        Self::setup(conn, false).await
    }

    async fn setup(conn: tokio_rusqlite::Connection, wal_mode: bool) -> Result<Self, CanteiroError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(migrations::run_migrations)
            .await
            .map_err(|e| CanteiroError::Storage {
                source: Box::new(e),
            })?;

        debug!(wal_mode, "database ready");
        Ok(Self { conn })
    }

    /// The underlying connection. Every query goes through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Convert a tokio-rusqlite error into [`CanteiroError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CanteiroError {
    CanteiroError::Storage {
        source: Box::new(e),
    }
}

/// Wraps a decode failure of column `idx` as a rusqlite conversion error.
pub(crate) fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
}
