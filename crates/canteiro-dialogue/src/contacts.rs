// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalization and contact-list authorization.
//!
//! Contact lists are edited by hand, so stored numbers come with and without
//! country codes, spaces and `+` signs. Matching is deliberately tolerant:
//! exact, containment either way, or equal last nine digits.

use std::sync::Arc;

pub use canteiro_core::normalize_phone;
use canteiro_core::{AuthorizationFailure, CanteiroError, Capability, ContactList, StorageAdapter};
use tracing::debug;

/// Digits compared when country codes differ (Portuguese national numbers).
const SUFFIX_DIGITS: usize = 9;

/// Tolerant phone comparison used to match senders against contact lists.
///
/// Containment only counts when the shorter number has at least nine digits,
/// so a stray `"1"` in a list cannot match everyone.
pub fn phones_match(a: &str, b: &str) -> bool {
    let a = normalize_phone(a);
    let b = normalize_phone(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if short.len() >= SUFFIX_DIGITS && long.contains(short.as_str()) {
        return true;
    }

    a.len() >= SUFFIX_DIGITS
        && b.len() >= SUFFIX_DIGITS
        && a[a.len() - SUFFIX_DIGITS..] == b[b.len() - SUFFIX_DIGITS..]
}

/// Snapshot of what a phone number may do, taken from the first matching entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactAuthorization {
    pub phone_number: String,
    pub contact_name: String,
    pub list_name: String,
    pub can_create_tickets: bool,
    pub can_register_attendance: bool,
    pub internal_user_id: Option<i64>,
    pub default_client_code: Option<String>,
    pub default_technician_code: Option<String>,
}

/// Scans `lists` in order for the first entry matching `phone` that grants `capability`.
pub fn authorize(
    lists: &[ContactList],
    phone: &str,
    capability: Capability,
) -> Result<ContactAuthorization, AuthorizationFailure> {
    let phone = normalize_phone(phone);
    let mut known = false;
    let mut missing_user = false;

    for list in lists {
        for entry in list.contacts.iter().filter(|c| phones_match(&c.phone, &phone)) {
            known = true;
            if !entry.grants(list, capability) {
                continue;
            }
            if capability == Capability::RegisterAttendance && entry.user_id.is_none() {
                missing_user = true;
                continue;
            }
            return Ok(ContactAuthorization {
                phone_number: phone,
                contact_name: entry.name.clone(),
                list_name: list.name.clone(),
                can_create_tickets: entry.grants(list, Capability::CreateTickets),
                can_register_attendance: entry.grants(list, Capability::RegisterAttendance),
                internal_user_id: entry.user_id,
                default_client_code: entry.client_code.clone(),
                default_technician_code: entry.technician_code.clone(),
            });
        }
    }

    Err(if missing_user {
        AuthorizationFailure::MissingLinkedUser
    } else if known {
        AuthorizationFailure::MissingCapability(capability)
    } else {
        AuthorizationFailure::NotFound
    })
}

/// Read-only view over the stored contact lists.
pub struct ContactDirectory {
    storage: Arc<dyn StorageAdapter>,
}

impl ContactDirectory {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Resolves `phone` for `capability`.
    ///
    /// Refusals come back as [`CanteiroError::Authorization`]; storage
    /// failures pass through unchanged.
    pub async fn resolve(
        &self,
        phone: &str,
        capability: Capability,
    ) -> Result<ContactAuthorization, CanteiroError> {
        let lists = self.storage.list_contact_lists().await?;
        let result = authorize(&lists, phone, capability);
        debug!(
            phone,
            %capability,
            lists = lists.len(),
            authorized = result.is_ok(),
            "contact lookup"
        );
        result.map_err(CanteiroError::Authorization)
    }
}
