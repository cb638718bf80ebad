// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the chat client, the downstream services and the
//! dialogue engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a message returned by the chat client after sending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Chat,
    Storage,
    Service,
}

// --- Chat types ---

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A message received from the chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    /// Raw chat address of the sender (e.g. `351912345678@c.us`).
    pub from: String,
    #[serde(default)]
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// Attached location payload, when the message is a location share.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Connection state of the chat client session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Waiting for the operator to scan a pairing QR code.
    AwaitingQr,
    Ready,
}

/// Events published by the chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Message(InboundMessage),
    Ready,
    Disconnected { reason: String },
    Qr { code: String },
}

// --- Authorization types ---

/// Capabilities a contact can be granted through contact lists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    CreateTickets,
    RegisterAttendance,
}

/// A named list of contacts with list-level permission flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub can_create_tickets: bool,
    #[serde(default)]
    pub can_register_attendance: bool,
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One contact inside a [`ContactList`]. Flags set here override the list's.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactEntry {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub can_create_tickets: Option<bool>,
    #[serde(default)]
    pub can_register_attendance: Option<bool>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub client_code: Option<String>,
    #[serde(default)]
    pub technician_code: Option<String>,
}

impl ContactEntry {
    /// Effective value of a capability for this entry inside `list`.
    pub fn grants(&self, list: &ContactList, capability: Capability) -> bool {
        match capability {
            Capability::CreateTickets => self
                .can_create_tickets
                .unwrap_or(list.can_create_tickets),
            Capability::RegisterAttendance => self
                .can_register_attendance
                .unwrap_or(list.can_register_attendance),
        }
    }
}

// --- Client directory types ---

/// A client of the company as known by the ERP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub code: String,
    pub name: String,
}

/// Result of a client lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLookup {
    pub exists: bool,
    #[serde(default)]
    pub client: Option<ClientRecord>,
    /// Names of clients close to the query, offered when nothing matched.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// An assistance contract of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// Result of a contract lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractLookup {
    #[serde(default)]
    pub active_contracts: Vec<Contract>,
}

// --- Ticket types ---

/// Ticket priority as understood by the ticket service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

/// Payload submitted to the ticket service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub client_code: String,
    pub client_name: String,
    pub description: String,
    pub priority: TicketPriority,
    pub technician: String,
    pub origin: String,
    pub category: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    /// Normalized phone number of the requester.
    pub requested_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub ticket_id: String,
}

// --- Attendance types ---

/// Clock-in or clock-out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ClockType {
    #[serde(rename = "entrada")]
    #[strum(serialize = "entrada")]
    In,
    #[serde(rename = "saida")]
    #[strum(serialize = "saida")]
    Out,
}

/// Payload submitted to the attendance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockRequest {
    pub user_id: i64,
    #[serde(default)]
    pub site_id: Option<i64>,
    #[serde(rename = "type")]
    pub clock_type: ClockType,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockReceipt {
    pub record_id: String,
}

/// An active work site (obra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// A push notification addressed to a technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub target_technician: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub ticket_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(tickets: bool, attendance: bool) -> ContactList {
        ContactList {
            id: "l1".into(),
            name: "Equipa A".into(),
            can_create_tickets: tickets,
            can_register_attendance: attendance,
            contacts: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn entry_flag_overrides_list_flag() {
        let l = list(true, false);
        let entry = ContactEntry {
            name: "Rui".into(),
            phone: "912345678".into(),
            can_create_tickets: Some(false),
            can_register_attendance: Some(true),
            ..Default::default()
        };
        assert!(!entry.grants(&l, Capability::CreateTickets));
        assert!(entry.grants(&l, Capability::RegisterAttendance));
    }

    #[test]
    fn entry_without_flags_inherits_list() {
        let l = list(true, false);
        let entry = ContactEntry {
            name: "Rui".into(),
            phone: "912345678".into(),
            ..Default::default()
        };
        assert!(entry.grants(&l, Capability::CreateTickets));
        assert!(!entry.grants(&l, Capability::RegisterAttendance));
    }

    #[test]
    fn clock_type_uses_portuguese_wire_names() {
        assert_eq!(serde_json::to_string(&ClockType::In).unwrap(), "\"entrada\"");
        assert_eq!(serde_json::to_string(&ClockType::Out).unwrap(), "\"saida\"");
        assert_eq!(ClockType::Out.to_string(), "saida");
    }

    #[test]
    fn ticket_priority_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TicketPriority::High).unwrap(),
            "\"high\""
        );
    }

    #[test]
    fn chat_event_is_internally_tagged() {
        let json = r#"{"type":"disconnected","reason":"NAVIGATION"}"#;
        let event: ChatEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, ChatEvent::Disconnected { reason } if reason == "NAVIGATION"));
    }

    #[test]
    fn inbound_message_defaults_body_and_location() {
        let json = r#"{"type":"message","id":"m1","from":"351912345678@c.us","timestamp":"2026-03-02T09:00:00Z"}"#;
        let event: ChatEvent = serde_json::from_str(json).unwrap();
        let ChatEvent::Message(msg) = event else {
            panic!("expected message event");
        };
        assert_eq!(msg.body, "");
        assert!(msg.location.is_none());
    }
}
