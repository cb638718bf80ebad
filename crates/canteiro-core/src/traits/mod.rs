// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility. The downstream
//! service traits are plain `Send + Sync` traits since one HTTP backend
//! usually implements all of them.

pub mod adapter;
pub mod chat;
pub mod services;
pub mod storage;

pub use adapter::PluginAdapter;
pub use chat::ChatClient;
pub use services::{
    AttendanceService, ClientDirectory, GeoLocator, NotificationService, SiteDirectory,
    TicketService,
};
pub use storage::StorageAdapter;
