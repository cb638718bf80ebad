// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schedule CRUD, manual trigger and test broadcast endpoints.
//!
//! Every write goes to storage first and then re-registers the timer, so
//! the runner always evaluates the latest stored definition.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use canteiro_core::{
    BroadcastPriority, CanteiroError, FireTime, Frequency, Recipient, Schedule, normalize_phone,
};
use canteiro_cron::BroadcastReport;

use crate::error::ApiError;
use crate::server::AppState;

fn default_enabled() -> bool {
    true
}

/// Body of create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    pub name: String,
    pub message: String,
    pub recipients: Vec<Recipient>,
    pub frequency: Frequency,
    pub fire_time: FireTime,
    #[serde(default)]
    pub active_days: Vec<u8>,
    /// Defaults to today in the schedule timezone.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: BroadcastPriority,
}

/// Body of `POST /v1/broadcasts/test`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestBroadcast {
    pub message: String,
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub priority: BroadcastPriority,
}

impl ScheduleInput {
    /// Checks the input and returns it with sorted, deduplicated days.
    fn validated(mut self) -> Result<Self, CanteiroError> {
        if self.name.trim().is_empty() {
            return Err(CanteiroError::Validation("name must not be empty".into()));
        }
        if self.message.trim().is_empty() {
            return Err(CanteiroError::Validation("message must not be empty".into()));
        }
        if self.recipients.is_empty() {
            return Err(CanteiroError::Validation(
                "at least one recipient is required".into(),
            ));
        }
        if let Some(bad) = self
            .recipients
            .iter()
            .find(|r| normalize_phone(&r.phone).is_empty())
        {
            return Err(CanteiroError::Validation(format!(
                "recipient `{}` has no usable phone number",
                bad.name
            )));
        }
        if let Some(day) = self.active_days.iter().find(|d| **d > 6) {
            return Err(CanteiroError::Validation(format!(
                "active day {day} is out of range, expected 0 (Sunday) to 6 (Saturday)"
            )));
        }
        self.active_days.sort_unstable();
        self.active_days.dedup();
        if matches!(self.frequency, Frequency::Weekly | Frequency::Custom)
            && self.active_days.is_empty()
        {
            return Err(CanteiroError::Validation(format!(
                "{} schedules need at least one active day",
                self.frequency
            )));
        }
        Ok(self)
    }
}

fn today(state: &AppState) -> NaiveDate {
    Utc::now().with_timezone(&state.runner.timezone()).date_naive()
}

async fn load(state: &AppState, id: &str) -> Result<Schedule, CanteiroError> {
    state
        .storage
        .get_schedule(id)
        .await?
        .ok_or_else(|| CanteiroError::not_found("schedule", id))
}

/// GET /v1/schedules
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.storage.list_schedules().await?))
}

/// GET /v1/schedules/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, ApiError> {
    Ok(Json(load(&state, &id).await?))
}

/// POST /v1/schedules
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<ScheduleInput>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    let input = input.validated()?;
    let now = Utc::now();
    let schedule = Schedule {
        id: uuid::Uuid::new_v4().to_string(),
        start_date: input.start_date.unwrap_or_else(|| today(&state)),
        name: input.name,
        message: input.message,
        recipients: input.recipients,
        frequency: input.frequency,
        fire_time: input.fire_time,
        active_days: input.active_days,
        enabled: input.enabled,
        priority: input.priority,
        last_fired_on: None,
        total_sent: 0,
        created_at: now,
        updated_at: now,
    };
    state.storage.create_schedule(&schedule).await?;
    state.runner.start_schedule(&schedule);

    tracing::info!(schedule_id = %schedule.id, name = %schedule.name, "schedule created");
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// PUT /v1/schedules/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ScheduleInput>,
) -> Result<Json<Schedule>, ApiError> {
    let input = input.validated()?;
    let existing = load(&state, &id).await?;
    let schedule = Schedule {
        start_date: input.start_date.unwrap_or(existing.start_date),
        name: input.name,
        message: input.message,
        recipients: input.recipients,
        frequency: input.frequency,
        fire_time: input.fire_time,
        active_days: input.active_days,
        enabled: input.enabled,
        priority: input.priority,
        updated_at: Utc::now(),
        ..existing
    };
    state.storage.update_schedule(&schedule).await?;
    // Firing counters may have moved since `existing` was read.
    let stored = load(&state, &id).await?;
    // Replaces the running timer; a disabled schedule ends up with none.
    state.runner.start_schedule(&stored);

    tracing::info!(schedule_id = %id, enabled = stored.enabled, "schedule updated");
    Ok(Json(stored))
}

/// DELETE /v1/schedules/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.storage.delete_schedule(&id).await?;
    state.runner.stop_schedule(&id);
    tracing::info!(schedule_id = %id, "schedule deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/schedules/{id}/trigger
pub async fn trigger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BroadcastReport>, ApiError> {
    Ok(Json(state.runner.fire_now(&id).await?))
}

/// POST /v1/broadcasts/test
pub async fn test_broadcast(
    State(state): State<AppState>,
    Json(body): Json<TestBroadcast>,
) -> Result<Json<BroadcastReport>, ApiError> {
    let report = state
        .runner
        .send_adhoc(&body.message, &body.recipients, body.priority)
        .await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(frequency: Frequency, days: Vec<u8>) -> ScheduleInput {
        ScheduleInput {
            name: "Bom dia".into(),
            message: "Bom dia equipa".into(),
            recipients: vec![Recipient {
                name: "Rui".into(),
                phone: "+351 912 345 678".into(),
            }],
            frequency,
            fire_time: FireTime::new(8, 0).unwrap(),
            active_days: days,
            start_date: None,
            enabled: true,
            priority: BroadcastPriority::Normal,
        }
    }

    #[test]
    fn days_are_sorted_and_deduplicated() {
        let ok = input(Frequency::Weekly, vec![5, 1, 3, 1]).validated().unwrap();
        assert_eq!(ok.active_days, vec![1, 3, 5]);
    }

    #[test]
    fn weekly_without_days_is_rejected() {
        assert!(input(Frequency::Weekly, vec![]).validated().is_err());
        assert!(input(Frequency::Custom, vec![]).validated().is_err());
        assert!(input(Frequency::Daily, vec![]).validated().is_ok());
    }

    #[test]
    fn out_of_range_day_is_rejected() {
        let err = input(Frequency::Weekly, vec![7]).validated().unwrap_err();
        assert!(err.to_string().contains("active day 7"));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut blank = input(Frequency::Daily, vec![]);
        blank.message = "  ".into();
        assert!(blank.validated().is_err());

        let mut no_phone = input(Frequency::Daily, vec![]);
        no_phone.recipients[0].phone = "n/a".into();
        assert!(no_phone.validated().is_err());

        let mut nobody = input(Frequency::Daily, vec![]);
        nobody.recipients.clear();
        assert!(nobody.validated().is_err());
    }

    #[test]
    fn enabled_defaults_to_true() {
        let parsed: ScheduleInput = serde_json::from_value(serde_json::json!({
            "name": "Aviso",
            "message": "Reunião às 9h",
            "recipients": [{"name": "Ana", "phone": "351911111111"}],
            "frequency": "daily",
            "fire_time": "08:45"
        }))
        .unwrap();
        assert!(parsed.enabled);
        assert_eq!(parsed.priority, BroadcastPriority::Normal);
        assert!(parsed.start_date.is_none());
    }
}
