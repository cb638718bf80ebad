// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded in-memory log of operational events.
//!
//! Entries are kept newest first. Once the capacity is reached the oldest
//! entry is evicted. Every append is mirrored as a `tracing` event so the
//! log also ends up in the process output. Timestamps come from the
//! injected [`Clock`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::clock::{Clock, SystemClock};

/// Default number of entries retained.
pub const DEFAULT_CAPACITY: usize = 500;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: u64,
    /// Schedule id or conversation phone number.
    pub scope: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Query parameters for [`ActivityLog::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActivityFilter {
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub struct ActivityLog {
    capacity: usize,
    next_id: AtomicU64,
    entries: Mutex<VecDeque<ActivityEntry>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityLog")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    /// Log stamped by the system clock.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_id: AtomicU64::new(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records an event and returns its id.
    pub fn append(
        &self,
        scope: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> u64 {
        let entry = ActivityEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            scope: scope.into(),
            severity,
            message: message.into(),
            timestamp: self.clock.now(),
            details,
        };

        match severity {
            Severity::Error => {
                tracing::error!(scope = %entry.scope, "{}", entry.message)
            }
            Severity::Warning => {
                tracing::warn!(scope = %entry.scope, "{}", entry.message)
            }
            Severity::Info | Severity::Success => {
                tracing::info!(scope = %entry.scope, severity = %severity, "{}", entry.message)
            }
        }

        let id = entry.id;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(self.capacity);
        id
    }

    /// Returns matching entries, newest first.
    pub fn query(&self, filter: &ActivityFilter) -> Vec<ActivityEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|e| filter.scope.as_deref().is_none_or(|s| e.scope == s))
            .filter(|e| filter.severity.is_none_or(|s| e.severity == s))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
