// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Canteiro bot.
//!
//! This crate provides the trait definitions, error types, and domain types
//! used throughout the Canteiro workspace: the chat client contract, the
//! downstream service contracts, storage, broadcast schedules and the
//! activity log.

pub mod activity;
pub mod clock;
pub mod error;
pub mod phone;
pub mod schedule;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use activity::{ActivityEntry, ActivityFilter, ActivityLog, Severity};
pub use clock::{Clock, SystemClock};
pub use error::{AuthorizationFailure, CanteiroError};
pub use phone::{chat_address, normalize_phone};
pub use schedule::{BroadcastPriority, FireTime, Frequency, Recipient, Schedule};
pub use types::{
    AdapterType, Capability, ChatEvent, ClientLookup, ClientRecord, ClockReceipt, ClockRequest,
    ClockType, ConnectionState, ContactEntry, ContactList, Contract, ContractLookup, GeoPoint,
    HealthStatus, InboundMessage, MessageId, Notification, Site, TicketPriority, TicketReceipt,
    TicketRequest,
};

pub use traits::{
    AttendanceService, ChatClient, ClientDirectory, GeoLocator, NotificationService,
    PluginAdapter, SiteDirectory, StorageAdapter, TicketService,
};
