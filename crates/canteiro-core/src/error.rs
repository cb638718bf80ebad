// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Canteiro bot.

use thiserror::Error;

use crate::types::Capability;

/// The primary error type used across all Canteiro adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CanteiroError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat client errors (send failure, bridge protocol error).
    #[error("chat error: {message}")]
    Chat {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The chat client is not connected; sending is impossible right now.
    #[error("chat client is not ready")]
    ClientNotReady,

    /// A downstream HTTP service (clients, tickets, attendance, sites) failed.
    #[error("{service} service error: {message}")]
    Service {
        service: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The sender is not allowed to perform the requested operation.
    #[error("not authorized: {0}")]
    Authorization(AuthorizationFailure),

    /// User input or API payload failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CanteiroError {
    /// Shorthand for a [`CanteiroError::Service`] without an underlying source.
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`CanteiroError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Why a phone number was refused by the contact directory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationFailure {
    /// No contact list contains the number.
    #[error("phone number is not registered in any contact list")]
    NotFound,

    /// The number is known but none of its entries grant the capability.
    #[error("contact lacks the {0} capability")]
    MissingCapability(Capability),

    /// The number may register attendance but has no linked internal user.
    #[error("contact has no linked internal user")]
    MissingLinkedUser,
}
