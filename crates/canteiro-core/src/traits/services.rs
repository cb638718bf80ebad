// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Downstream service traits used by the dialogue engine.

use async_trait::async_trait;

use crate::error::CanteiroError;
use crate::types::{
    ClientLookup, ClockReceipt, ClockRequest, ContractLookup, GeoPoint, Notification, Site,
    TicketReceipt, TicketRequest,
};

/// Looks up clients and their assistance contracts.
#[async_trait]
pub trait ClientDirectory: Send + Sync + 'static {
    async fn lookup_client(&self, query: &str) -> Result<ClientLookup, CanteiroError>;

    async fn lookup_contracts(&self, client_code: &str) -> Result<ContractLookup, CanteiroError>;
}

#[async_trait]
pub trait TicketService: Send + Sync + 'static {
    async fn submit_ticket(&self, request: TicketRequest) -> Result<TicketReceipt, CanteiroError>;
}

#[async_trait]
pub trait AttendanceService: Send + Sync + 'static {
    async fn register_clock(&self, request: ClockRequest) -> Result<ClockReceipt, CanteiroError>;
}

#[async_trait]
pub trait SiteDirectory: Send + Sync + 'static {
    async fn list_active_sites(&self) -> Result<Vec<Site>, CanteiroError>;
}

/// Fire-and-forget notifications to technicians.
#[async_trait]
pub trait NotificationService: Send + Sync + 'static {
    async fn notify(&self, notification: Notification) -> Result<(), CanteiroError>;
}

/// Approximate location of the bot host, from its public IP address.
#[async_trait]
pub trait GeoLocator: Send + Sync + 'static {
    async fn locate(&self) -> Result<Option<GeoPoint>, CanteiroError>;
}
