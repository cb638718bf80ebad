// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact list CRUD operations.

use canteiro_core::{CanteiroError, ContactList};
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use crate::database::{Database, conversion_err, map_tr_err};

const COLUMNS: &str =
    "id, name, can_create_tickets, can_register_attendance, contacts, created_at, updated_at";

fn encode_contacts(list: &ContactList) -> Result<String, CanteiroError> {
    serde_json::to_string(&list.contacts).map_err(|e| CanteiroError::Storage {
        source: Box::new(e),
    })
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn list_from_row(row: &Row<'_>) -> rusqlite::Result<ContactList> {
    let contacts: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(ContactList {
        id: row.get(0)?,
        name: row.get(1)?,
        can_create_tickets: row.get(2)?,
        can_register_attendance: row.get(3)?,
        contacts: serde_json::from_str(&contacts).map_err(|e| conversion_err(4, e))?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

/// Insert a new contact list.
pub async fn create_contact_list(db: &Database, list: &ContactList) -> Result<(), CanteiroError> {
    let contacts = encode_contacts(list)?;
    let list = list.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT INTO contact_lists ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    list.id,
                    list.name,
                    list.can_create_tickets,
                    list.can_register_attendance,
                    contacts,
                    list.created_at.to_rfc3339(),
                    list.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a contact list by ID.
pub async fn get_contact_list(
    db: &Database,
    id: &str,
) -> Result<Option<ContactList>, CanteiroError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM contact_lists WHERE id = ?1"))?;
            match stmt.query_row(params![id], list_from_row) {
                Ok(list) => Ok(Some(list)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all contact lists in creation order.
///
/// Authorization scans rely on this order: the first matching entry wins.
pub async fn list_contact_lists(db: &Database) -> Result<Vec<ContactList>, CanteiroError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM contact_lists ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], list_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace name, flags and contacts of an existing list.
pub async fn update_contact_list(db: &Database, list: &ContactList) -> Result<(), CanteiroError> {
    let contacts = encode_contacts(list)?;
    let list = list.clone();
    let id = list.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contact_lists SET name = ?2, can_create_tickets = ?3,
                     can_register_attendance = ?4, contacts = ?5, updated_at = ?6
                 WHERE id = ?1",
                params![
                    list.id,
                    list.name,
                    list.can_create_tickets,
                    list.can_register_attendance,
                    contacts,
                    list.updated_at.to_rfc3339(),
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CanteiroError::not_found("contact list", id));
    }
    Ok(())
}

/// Delete a contact list.
pub async fn delete_contact_list(db: &Database, id: &str) -> Result<(), CanteiroError> {
    let owned = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM contact_lists WHERE id = ?1", params![owned]))
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CanteiroError::not_found("contact list", id));
    }
    Ok(())
}
