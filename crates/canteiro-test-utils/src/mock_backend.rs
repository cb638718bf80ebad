// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stand-ins for the downstream HTTP services.
//!
//! One `MockBackend` implements every service trait the dialogue engine
//! needs. Requests are recorded for assertion; failures can be switched on
//! per service.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use canteiro_core::{
    AttendanceService, CanteiroError, ClientDirectory, ClientLookup, ClientRecord, ClockReceipt,
    ClockRequest, Contract, ContractLookup, GeoLocator, GeoPoint, Notification,
    NotificationService, Site, SiteDirectory, TicketReceipt, TicketRequest, TicketService,
};

use crate::lock;

#[derive(Default)]
pub struct MockBackend {
    clients: Mutex<Vec<ClientRecord>>,
    contracts: Mutex<HashMap<String, Vec<Contract>>>,
    sites: Mutex<Vec<Site>>,
    tickets: Mutex<Vec<TicketRequest>>,
    clocks: Mutex<Vec<ClockRequest>>,
    notifications: Mutex<Vec<Notification>>,
    failures: Mutex<HashMap<&'static str, String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, code: &str, name: &str) {
        lock(&self.clients).push(ClientRecord {
            code: code.into(),
            name: name.into(),
        });
    }

    pub fn set_contracts(&self, client_code: &str, ids: &[&str]) {
        let contracts = ids
            .iter()
            .map(|id| Contract {
                id: (*id).to_string(),
                description: format!("Contrato {id}"),
            })
            .collect();
        lock(&self.contracts).insert(client_code.to_string(), contracts);
    }

    pub fn set_sites(&self, sites: Vec<Site>) {
        *lock(&self.sites) = sites;
    }

    /// Makes every call to `service` fail with `message`.
    ///
    /// Services: `clients`, `tickets`, `attendance`, `sites`, `notifications`.
    pub fn fail(&self, service: &'static str, message: &str) {
        lock(&self.failures).insert(service, message.to_string());
    }

    pub fn tickets(&self) -> Vec<TicketRequest> {
        lock(&self.tickets).clone()
    }

    pub fn clocks(&self) -> Vec<ClockRequest> {
        lock(&self.clocks).clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    fn check(&self, service: &'static str) -> Result<(), CanteiroError> {
        match lock(&self.failures).get(service) {
            Some(message) => Err(CanteiroError::service(service, message.clone())),
            None => Ok(()),
        }
    }
}

/// A site with coordinates, for tests.
pub fn site(id: i64, name: &str, location: Option<GeoPoint>) -> Site {
    Site {
        id,
        code: format!("OB{id:03}"),
        name: name.to_string(),
        location,
    }
}

#[async_trait]
impl ClientDirectory for MockBackend {
    async fn lookup_client(&self, query: &str) -> Result<ClientLookup, CanteiroError> {
        self.check("clients")?;
        let query = query.trim().to_lowercase();
        let clients = lock(&self.clients).clone();
        let found = clients
            .iter()
            .find(|c| c.code.to_lowercase() == query || c.name.to_lowercase() == query)
            .cloned();
        Ok(match found {
            Some(client) => ClientLookup {
                exists: true,
                client: Some(client),
                suggestions: Vec::new(),
            },
            None => ClientLookup {
                exists: false,
                client: None,
                suggestions: clients.into_iter().map(|c| c.name).collect(),
            },
        })
    }

    async fn lookup_contracts(&self, client_code: &str) -> Result<ContractLookup, CanteiroError> {
        self.check("clients")?;
        Ok(ContractLookup {
            active_contracts: lock(&self.contracts)
                .get(client_code)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl TicketService for MockBackend {
    async fn submit_ticket(&self, request: TicketRequest) -> Result<TicketReceipt, CanteiroError> {
        self.check("tickets")?;
        let mut tickets = lock(&self.tickets);
        tickets.push(request);
        Ok(TicketReceipt {
            ticket_id: format!("T-{:04}", tickets.len()),
        })
    }
}

#[async_trait]
impl AttendanceService for MockBackend {
    async fn register_clock(&self, request: ClockRequest) -> Result<ClockReceipt, CanteiroError> {
        self.check("attendance")?;
        let mut clocks = lock(&self.clocks);
        clocks.push(request);
        Ok(ClockReceipt {
            record_id: format!("R-{:04}", clocks.len()),
        })
    }
}

#[async_trait]
impl SiteDirectory for MockBackend {
    async fn list_active_sites(&self) -> Result<Vec<Site>, CanteiroError> {
        self.check("sites")?;
        Ok(lock(&self.sites).clone())
    }
}

#[async_trait]
impl NotificationService for MockBackend {
    async fn notify(&self, notification: Notification) -> Result<(), CanteiroError> {
        self.check("notifications")?;
        lock(&self.notifications).push(notification);
        Ok(())
    }
}

/// How [`MockGeoLocator`] answers.
#[derive(Debug, Clone)]
pub enum GeoBehavior {
    Found(GeoPoint),
    Unavailable,
    Fail(String),
    /// Never answers; exercises the caller's timeout.
    Hang,
}

pub struct MockGeoLocator {
    behavior: Mutex<GeoBehavior>,
}

impl MockGeoLocator {
    pub fn new(behavior: GeoBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
        }
    }

    pub fn set(&self, behavior: GeoBehavior) {
        *lock(&self.behavior) = behavior;
    }
}

impl Default for MockGeoLocator {
    fn default() -> Self {
        Self::new(GeoBehavior::Unavailable)
    }
}

#[async_trait]
impl GeoLocator for MockGeoLocator {
    async fn locate(&self) -> Result<Option<GeoPoint>, CanteiroError> {
        let behavior = lock(&self.behavior).clone();
        match behavior {
            GeoBehavior::Found(point) => Ok(Some(point)),
            GeoBehavior::Unavailable => Ok(None),
            GeoBehavior::Fail(message) => Err(CanteiroError::service("geolocation", message)),
            GeoBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_by_code_or_name() {
        let backend = MockBackend::new();
        backend.add_client("C001", "ACME");
        assert!(backend.lookup_client("acme").await.unwrap().exists);
        assert!(backend.lookup_client("c001").await.unwrap().exists);

        let miss = backend.lookup_client("ACMA").await.unwrap();
        assert!(!miss.exists);
        assert_eq!(miss.suggestions, vec!["ACME".to_string()]);
    }

    #[tokio::test]
    async fn failures_are_service_errors() {
        let backend = MockBackend::new();
        backend.fail("tickets", "HTTP 500");
        let err = backend
            .submit_ticket(TicketRequest {
                client_code: "C".into(),
                client_name: "C".into(),
                description: "d".into(),
                priority: canteiro_core::TicketPriority::Low,
                technician: "000".into(),
                origin: "WHATSAPP".into(),
                category: "ASSISTENCIA".into(),
                contract_id: None,
                requested_by: "1".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "tickets service error: HTTP 500");
    }
}
