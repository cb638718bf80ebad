// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact list endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use canteiro_core::{CanteiroError, ContactEntry, ContactList, normalize_phone};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactListInput {
    pub name: String,
    #[serde(default)]
    pub can_create_tickets: bool,
    #[serde(default)]
    pub can_register_attendance: bool,
    #[serde(default)]
    pub contacts: Vec<ContactEntry>,
}

impl ContactListInput {
    fn validated(self) -> Result<Self, CanteiroError> {
        if self.name.trim().is_empty() {
            return Err(CanteiroError::Validation("name must not be empty".into()));
        }
        if let Some(bad) = self
            .contacts
            .iter()
            .find(|c| normalize_phone(&c.phone).is_empty())
        {
            return Err(CanteiroError::Validation(format!(
                "contact `{}` has no usable phone number",
                bad.name
            )));
        }
        Ok(self)
    }
}

/// GET /v1/contact-lists
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ContactList>>, ApiError> {
    Ok(Json(state.storage.list_contact_lists().await?))
}

/// GET /v1/contact-lists/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContactList>, ApiError> {
    let list = state
        .storage
        .get_contact_list(&id)
        .await?
        .ok_or_else(|| CanteiroError::not_found("contact list", &id))?;
    Ok(Json(list))
}

/// POST /v1/contact-lists
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<ContactListInput>,
) -> Result<(StatusCode, Json<ContactList>), ApiError> {
    let input = input.validated()?;
    let now = Utc::now();
    let list = ContactList {
        id: uuid::Uuid::new_v4().to_string(),
        name: input.name,
        can_create_tickets: input.can_create_tickets,
        can_register_attendance: input.can_register_attendance,
        contacts: input.contacts,
        created_at: now,
        updated_at: now,
    };
    state.storage.create_contact_list(&list).await?;
    tracing::info!(list_id = %list.id, contacts = list.contacts.len(), "contact list created");
    Ok((StatusCode::CREATED, Json(list)))
}

/// PUT /v1/contact-lists/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ContactListInput>,
) -> Result<Json<ContactList>, ApiError> {
    let input = input.validated()?;
    let existing = state
        .storage
        .get_contact_list(&id)
        .await?
        .ok_or_else(|| CanteiroError::not_found("contact list", &id))?;
    let list = ContactList {
        name: input.name,
        can_create_tickets: input.can_create_tickets,
        can_register_attendance: input.can_register_attendance,
        contacts: input.contacts,
        updated_at: Utc::now(),
        ..existing
    };
    state.storage.update_contact_list(&list).await?;
    Ok(Json(list))
}

/// DELETE /v1/contact-lists/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_contact_list(&id).await?;
    tracing::info!(list_id = %id, "contact list deleted");
    Ok(StatusCode::NO_CONTENT)
}
