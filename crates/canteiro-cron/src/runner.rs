// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-schedule timers.
//!
//! Every enabled schedule owns a ticker task guarded by its own
//! [`CancellationToken`]. Registering a schedule again cancels the previous
//! ticker before installing the new one, so at most one timer exists per id.
//!
//! Cancellation only takes effect between ticks. A tick already sending when
//! its timer is replaced runs to completion, so ticks for the same id are
//! serialized behind a per-id lock and the fire decision is made only once
//! the lock is held.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono_tz::Tz;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use canteiro_config::model::ScheduleConfig;
use canteiro_core::{
    ActivityLog, BroadcastPriority, CanteiroError, ChatClient, Clock, Recipient, Schedule,
    Severity, StorageAdapter,
};

use crate::broadcast::{BroadcastExecutor, BroadcastReport};
use crate::rules::{self, FireDecision};

/// Scope used in the activity log for ad-hoc test broadcasts.
pub const ADHOC_SCOPE: &str = "test-broadcast";

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The schedule no longer exists.
    Missing,
    /// Current minute differs from the fire time.
    NotTime,
    Skipped(FireDecision),
    /// Chat session down; the day stays unmarked.
    ClientNotReady,
    Fired(BroadcastReport),
}

pub struct ScheduleRunner {
    storage: Arc<dyn StorageAdapter>,
    chat: Arc<dyn ChatClient>,
    executor: BroadcastExecutor,
    activity: Arc<ActivityLog>,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    tick_interval: Duration,
    timers: Mutex<HashMap<String, CancellationToken>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    tracker: TaskTracker,
}

impl ScheduleRunner {
    pub fn new(
        config: &ScheduleConfig,
        storage: Arc<dyn StorageAdapter>,
        chat: Arc<dyn ChatClient>,
        activity: Arc<ActivityLog>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CanteiroError> {
        let timezone: Tz = config.timezone.parse().map_err(|e| {
            CanteiroError::Config(format!("invalid timezone `{}`: {e}", config.timezone))
        })?;
        if config.tick_interval_secs == 0 {
            return Err(CanteiroError::Config(
                "schedule.tick_interval_secs must be greater than zero".into(),
            ));
        }

        Ok(Self {
            executor: BroadcastExecutor::new(chat.clone(), activity.clone(), config.send_delay()),
            storage,
            chat,
            activity,
            clock,
            timezone,
            tick_interval: config.tick_interval(),
            timers: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            tracker: TaskTracker::new(),
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Registers every enabled stored schedule and returns how many were started.
    pub async fn start_all(self: &Arc<Self>) -> Result<usize, CanteiroError> {
        let schedules = self.storage.list_schedules().await?;
        let started = schedules
            .iter()
            .filter(|schedule| self.start_schedule(schedule))
            .count();
        info!(started, total = schedules.len(), "schedule timers registered");
        Ok(started)
    }

    /// Replaces the timer for `schedule.id`. Returns false when the schedule
    /// is disabled and therefore left unregistered.
    pub fn start_schedule(self: &Arc<Self>, schedule: &Schedule) -> bool {
        let mut timers = self.timers();
        if let Some(previous) = timers.remove(&schedule.id) {
            previous.cancel();
        }
        if !schedule.enabled {
            debug!(schedule_id = %schedule.id, "schedule disabled, timer not installed");
            return false;
        }

        let token = CancellationToken::new();
        timers.insert(schedule.id.clone(), token.clone());
        drop(timers);

        let runner = Arc::clone(self);
        let id = schedule.id.clone();
        self.tracker.spawn(async move {
            let mut interval = tokio::time::interval(runner.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        match runner.run_tick(&id).await {
                            Ok(TickOutcome::Missing) => {
                                warn!(schedule_id = %id, "schedule removed from storage, stopping timer");
                                token.cancel();
                                runner.release_timer(&id);
                                break;
                            }
                            Ok(TickOutcome::Fired(report)) => {
                                info!(
                                    schedule_id = %id,
                                    sent = report.success_count,
                                    failed = report.error_count,
                                    "scheduled broadcast fired"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => {
                                error!(schedule_id = %id, error = %e, "schedule tick failed");
                                runner.activity.append(
                                    id.as_str(),
                                    Severity::Error,
                                    format!("schedule tick failed: {e}"),
                                    None,
                                );
                            }
                        }
                    }
                }
            }
            debug!(schedule_id = %id, "schedule timer stopped");
        });
        true
    }

    /// Cancels the timer for `id`. Returns whether one was registered.
    pub fn stop_schedule(&self, id: &str) -> bool {
        match self.timers().remove(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let mut timers = self.timers();
        for (_, token) in timers.drain() {
            token.cancel();
        }
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.timers().get(id).is_some_and(|t| !t.is_cancelled())
    }

    /// Ids with a registered timer, sorted.
    pub fn registered(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.timers().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Evaluates one schedule against the current time and fires it if due.
    ///
    /// Holds the per-id lock for the whole tick, so a replacement timer
    /// re-reads the schedule only after a running broadcast has been recorded.
    pub async fn run_tick(&self, id: &str) -> Result<TickOutcome, CanteiroError> {
        let lock = self.in_flight_lock(id);
        let _held = lock.lock().await;

        let Some(schedule) = self.storage.get_schedule(id).await? else {
            self.in_flight_map().remove(id);
            return Ok(TickOutcome::Missing);
        };

        let now = self.clock.now().with_timezone(&self.timezone);
        if !rules::is_fire_minute(&schedule, &now) {
            return Ok(TickOutcome::NotTime);
        }

        let decision = rules::decide(&schedule, &now);
        if decision != FireDecision::Fire {
            debug!(schedule_id = %id, decision = decision.as_str(), "schedule not due");
            return Ok(TickOutcome::Skipped(decision));
        }

        if !self.chat.is_ready() {
            return Ok(self.skip_not_ready(id));
        }

        let report = match self
            .executor
            .execute(&schedule.id, &schedule.message, &schedule.recipients, schedule.priority)
            .await
        {
            Ok(report) => report,
            Err(CanteiroError::ClientNotReady) => return Ok(self.skip_not_ready(id)),
            Err(e) => return Err(e),
        };

        self.storage
            .record_schedule_fired(id, now.date_naive(), report.success_count)
            .await?;
        Ok(TickOutcome::Fired(report))
    }

    /// Manual trigger: ignores the time rules and leaves `last_fired_on` alone.
    pub async fn fire_now(&self, id: &str) -> Result<BroadcastReport, CanteiroError> {
        let schedule = self
            .storage
            .get_schedule(id)
            .await?
            .ok_or_else(|| CanteiroError::not_found("schedule", id))?;

        self.activity
            .append(id, Severity::Info, "manual trigger requested", None);
        let report = self
            .executor
            .execute(&schedule.id, &schedule.message, &schedule.recipients, schedule.priority)
            .await?;
        self.storage.add_schedule_sent(id, report.success_count).await?;
        Ok(report)
    }

    /// One-off broadcast that is never persisted.
    pub async fn send_adhoc(
        &self,
        message: &str,
        recipients: &[Recipient],
        priority: BroadcastPriority,
    ) -> Result<BroadcastReport, CanteiroError> {
        if message.trim().is_empty() {
            return Err(CanteiroError::Validation("message must not be empty".into()));
        }
        if recipients.is_empty() {
            return Err(CanteiroError::Validation(
                "at least one recipient is required".into(),
            ));
        }
        self.executor
            .execute(ADHOC_SCOPE, message, recipients, priority)
            .await
    }

    /// Stops every timer and waits for in-flight ticks to finish.
    pub async fn shutdown(&self) {
        self.stop_all();
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn skip_not_ready(&self, id: &str) -> TickOutcome {
        self.activity.append(
            id,
            Severity::Warning,
            "chat client not ready, broadcast skipped",
            None,
        );
        TickOutcome::ClientNotReady
    }

    /// Drops the map entry for `id` if it still holds a cancelled token.
    /// A live token means the schedule was registered again meanwhile.
    fn release_timer(&self, id: &str) {
        let mut timers = self.timers();
        if timers.get(id).is_some_and(CancellationToken::is_cancelled) {
            timers.remove(id);
        }
    }

    fn in_flight_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight_map()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight_map(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
