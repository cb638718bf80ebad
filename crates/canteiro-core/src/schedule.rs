// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast schedule definitions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How often a schedule fires.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Frequency {
    Daily,
    /// On the weekdays listed in `active_days`.
    Weekly,
    /// On the first day of each month.
    Monthly,
    /// Same rule as weekly; kept apart because operators pick it for irregular day sets.
    Custom,
    /// Fires every day; used while setting up a broadcast.
    Test,
}

/// Urgency of a broadcast, rendered as a text prefix.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BroadcastPriority {
    #[default]
    Normal,
    Info,
    Warning,
    Urgent,
}

impl BroadcastPriority {
    /// Text placed in front of the message body, if any.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Info => Some("ℹ️ *INFORMAÇÃO*"),
            Self::Warning => Some("⚠️ *AVISO*"),
            Self::Urgent => Some("🚨 *URGENTE*"),
        }
    }

    /// Applies [`prefix`](Self::prefix) to `message`.
    pub fn decorate(self, message: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}\n\n{message}"),
            None => message.to_string(),
        }
    }
}

/// Hour and minute of day, serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FireTime {
    hour: u8,
    minute: u8,
}

impl FireTime {
    /// Returns `None` when the hour or minute is out of range.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }
}

impl fmt::Display for FireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for FireTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("invalid time `{s}`, expected HH:MM"))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| format!("invalid hour in `{s}`"))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| format!("invalid minute in `{s}`"))?;
        Self::new(hour, minute).ok_or_else(|| format!("time `{s}` out of range"))
    }
}

impl TryFrom<String> for FireTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FireTime> for String {
    fn from(value: FireTime) -> Self {
        value.to_string()
    }
}

/// One addressee of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
}

/// A persisted recurring broadcast rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    pub message: String,
    pub recipients: Vec<Recipient>,
    pub frequency: Frequency,
    /// Wall-clock time in the reference timezone.
    pub fire_time: FireTime,
    /// Weekday numbers, 0 = Sunday through 6 = Saturday.
    #[serde(default)]
    pub active_days: Vec<u8>,
    pub start_date: NaiveDate,
    pub enabled: bool,
    #[serde(default)]
    pub priority: BroadcastPriority,
    /// Reference-timezone date of the last scheduled firing.
    #[serde(default)]
    pub last_fired_on: Option<NaiveDate>,
    #[serde(default)]
    pub total_sent: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
