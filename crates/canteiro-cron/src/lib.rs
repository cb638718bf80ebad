// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring broadcasts for the Canteiro bot.
//!
//! [`ScheduleRunner`] keeps one minute ticker per enabled schedule. Each tick
//! re-reads the stored definition, applies the firing rules in [`rules`] in
//! the reference timezone and hands matching schedules to the
//! [`BroadcastExecutor`], which delivers the message recipient by recipient.

pub mod broadcast;
pub mod rules;
pub mod runner;

pub use broadcast::{BroadcastExecutor, BroadcastReport, DeliveryStatus, RecipientResult};
pub use rules::{FireDecision, decide, is_fire_minute, should_fire_today};
pub use runner::{ScheduleRunner, TickOutcome};
