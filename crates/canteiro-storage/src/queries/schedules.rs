// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schedule CRUD operations.

use canteiro_core::{CanteiroError, Schedule};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Row, params};

use crate::database::{Database, conversion_err, map_tr_err};

const COLUMNS: &str = "id, name, message, recipients, frequency, fire_time, active_days, \
     start_date, enabled, priority, last_fired_on, total_sent, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column values of a schedule, encoded for SQLite.
struct ScheduleRow {
    id: String,
    name: String,
    message: String,
    recipients: String,
    frequency: String,
    fire_time: String,
    active_days: String,
    start_date: String,
    enabled: bool,
    priority: String,
    last_fired_on: Option<String>,
    total_sent: i64,
    created_at: String,
    updated_at: String,
}

impl ScheduleRow {
    fn encode(schedule: &Schedule) -> Result<Self, CanteiroError> {
        let json = |e: serde_json::Error| CanteiroError::Storage {
            source: Box::new(e),
        };
        Ok(Self {
            id: schedule.id.clone(),
            name: schedule.name.clone(),
            message: schedule.message.clone(),
            recipients: serde_json::to_string(&schedule.recipients).map_err(json)?,
            frequency: schedule.frequency.to_string(),
            fire_time: schedule.fire_time.to_string(),
            active_days: serde_json::to_string(&schedule.active_days).map_err(json)?,
            start_date: schedule.start_date.format(DATE_FORMAT).to_string(),
            enabled: schedule.enabled,
            priority: schedule.priority.to_string(),
            last_fired_on: schedule
                .last_fired_on
                .map(|d| d.format(DATE_FORMAT).to_string()),
            total_sent: i64::try_from(schedule.total_sent).unwrap_or(i64::MAX),
            created_at: schedule.created_at.to_rfc3339(),
            updated_at: schedule.updated_at.to_rfc3339(),
        })
    }
}

fn parse_date(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| conversion_err(idx, e))
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    let recipients: String = row.get(3)?;
    let frequency: String = row.get(4)?;
    let fire_time: String = row.get(5)?;
    let active_days: String = row.get(6)?;
    let start_date: String = row.get(7)?;
    let priority: String = row.get(9)?;
    let last_fired_on: Option<String> = row.get(10)?;
    let total_sent: i64 = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Schedule {
        id: row.get(0)?,
        name: row.get(1)?,
        message: row.get(2)?,
        recipients: serde_json::from_str(&recipients).map_err(|e| conversion_err(3, e))?,
        frequency: frequency.parse().map_err(|e| conversion_err(4, e))?,
        fire_time: fire_time.parse().map_err(|e| conversion_err(5, e))?,
        active_days: serde_json::from_str(&active_days).map_err(|e| conversion_err(6, e))?,
        start_date: parse_date(7, &start_date)?,
        enabled: row.get(8)?,
        priority: priority.parse().map_err(|e| conversion_err(9, e))?,
        last_fired_on: last_fired_on
            .as_deref()
            .map(|d| parse_date(10, d))
            .transpose()?,
        total_sent: u64::try_from(total_sent).unwrap_or_default(),
        created_at: parse_timestamp(12, &created_at)?,
        updated_at: parse_timestamp(13, &updated_at)?,
    })
}

/// Insert a new schedule.
pub async fn create_schedule(db: &Database, schedule: &Schedule) -> Result<(), CanteiroError> {
    let r = ScheduleRow::encode(schedule)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO schedules ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    r.id,
                    r.name,
                    r.message,
                    r.recipients,
                    r.frequency,
                    r.fire_time,
                    r.active_days,
                    r.start_date,
                    r.enabled,
                    r.priority,
                    r.last_fired_on,
                    r.total_sent,
                    r.created_at,
                    r.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a schedule by ID.
pub async fn get_schedule(db: &Database, id: &str) -> Result<Option<Schedule>, CanteiroError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM schedules WHERE id = ?1"))?;
            match stmt.query_row(params![id], schedule_from_row) {
                Ok(schedule) => Ok(Some(schedule)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all schedules, oldest first.
pub async fn list_schedules(db: &Database) -> Result<Vec<Schedule>, CanteiroError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM schedules ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], schedule_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace every editable field of an existing schedule.
///
/// `last_fired_on` and `total_sent` belong to the runner and are never
/// written here, whatever the passed schedule carries.
pub async fn update_schedule(db: &Database, schedule: &Schedule) -> Result<(), CanteiroError> {
    let r = ScheduleRow::encode(schedule)?;
    let id = r.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE schedules SET name = ?2, message = ?3, recipients = ?4, frequency = ?5,
                     fire_time = ?6, active_days = ?7, start_date = ?8, enabled = ?9,
                     priority = ?10, updated_at = ?11
                 WHERE id = ?1",
                params![
                    r.id,
                    r.name,
                    r.message,
                    r.recipients,
                    r.frequency,
                    r.fire_time,
                    r.active_days,
                    r.start_date,
                    r.enabled,
                    r.priority,
                    r.updated_at,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_found(changed, &id)
}

/// Delete a schedule.
pub async fn delete_schedule(db: &Database, id: &str) -> Result<(), CanteiroError> {
    let owned = id.to_string();
    let changed = db
        .connection()
        .call(move |conn| conn.execute("DELETE FROM schedules WHERE id = ?1", params![owned]))
        .await
        .map_err(map_tr_err)?;
    ensure_found(changed, id)
}

/// Set `last_fired_on` and add to `total_sent` in one statement.
pub async fn record_fired(
    db: &Database,
    id: &str,
    fired_on: NaiveDate,
    sent: u64,
) -> Result<(), CanteiroError> {
    let owned = id.to_string();
    let fired_on = fired_on.format(DATE_FORMAT).to_string();
    let sent = i64::try_from(sent).unwrap_or(i64::MAX);
    let now = Utc::now().to_rfc3339();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE schedules SET last_fired_on = ?2, total_sent = total_sent + ?3,
                     updated_at = ?4
                 WHERE id = ?1",
                params![owned, fired_on, sent, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_found(changed, id)
}

/// Add to `total_sent` only.
pub async fn add_sent(db: &Database, id: &str, sent: u64) -> Result<(), CanteiroError> {
    let owned = id.to_string();
    let sent = i64::try_from(sent).unwrap_or(i64::MAX);
    let now = Utc::now().to_rfc3339();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE schedules SET total_sent = total_sent + ?2, updated_at = ?3 WHERE id = ?1",
                params![owned, sent, now],
            )
        })
        .await
        .map_err(map_tr_err)?;
    ensure_found(changed, id)
}

fn ensure_found(changed: usize, id: &str) -> Result<(), CanteiroError> {
    if changed == 0 {
        Err(CanteiroError::not_found("schedule", id))
    } else {
        Ok(())
    }
}
