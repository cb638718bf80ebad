// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure firing rules, evaluated against a wall-clock time in the reference
//! timezone.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use canteiro_core::{Frequency, Schedule};

/// Why a schedule does or does not fire today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    Fire,
    Disabled,
    AlreadyFiredToday,
    NotStarted,
    /// The frequency rule excludes today.
    NotScheduledToday,
}

impl FireDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Disabled => "disabled",
            Self::AlreadyFiredToday => "already_fired_today",
            Self::NotStarted => "not_started",
            Self::NotScheduledToday => "not_scheduled_today",
        }
    }
}

/// True when `now` falls in the schedule's `HH:MM` minute.
pub fn is_fire_minute<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> bool {
    now.hour() == u32::from(schedule.fire_time.hour())
        && now.minute() == u32::from(schedule.fire_time.minute())
}

/// Applies the day-level rules; the time of day is not considered.
pub fn decide<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> FireDecision {
    let today = now.date_naive();

    if !schedule.enabled {
        return FireDecision::Disabled;
    }
    if schedule.last_fired_on == Some(today) {
        return FireDecision::AlreadyFiredToday;
    }
    if today < schedule.start_date {
        return FireDecision::NotStarted;
    }

    let scheduled = match schedule.frequency {
        Frequency::Daily | Frequency::Test => true,
        Frequency::Weekly | Frequency::Custom => {
            let weekday = now.weekday().num_days_from_sunday();
            schedule
                .active_days
                .iter()
                .any(|&d| u32::from(d) == weekday)
        }
        Frequency::Monthly => now.day() == 1,
    };

    if scheduled {
        FireDecision::Fire
    } else {
        FireDecision::NotScheduledToday
    }
}

pub fn should_fire_today<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> bool {
    decide(schedule, now) == FireDecision::Fire
}
