// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Canteiro integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a WhatsApp session or downstream services.
//!
//! # Components
//!
//! - [`MockChatClient`] - chat client with event injection and captured sends
//! - [`MockBackend`] - every downstream service trait, in memory
//! - [`MockGeoLocator`] - scripted IP geolocation
//! - [`ManualClock`] - clock that only moves when told to
//! - [`TestHarness`] - a dialogue engine wired to all of the above

pub mod clock;
pub mod harness;
pub mod mock_backend;
pub mod mock_chat;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder, temp_storage};
pub use mock_backend::{GeoBehavior, MockBackend, MockGeoLocator, site};
pub use mock_chat::{MockChatClient, SentMessage};

/// Locks a mutex, ignoring poisoning from a panicked test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
