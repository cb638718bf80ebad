// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Management HTTP API.
//!
//! Operators manage broadcast schedules and contact lists, inspect the
//! activity log and the WhatsApp session, and the bridge sidecar posts its
//! webhook events here. Everything under `/v1` requires the bearer token;
//! `/health` is public and `/webhooks/whatsapp` is authenticated by its
//! HMAC signature instead.

pub mod auth;
pub mod contacts;
pub mod error;
pub mod handlers;
pub mod schedules;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{AppState, router, serve};
