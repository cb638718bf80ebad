// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each function takes a [`Database`](crate::Database)
//! and runs on the single writer thread.

pub mod contact_lists;
pub mod schedules;
