// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a parseable timezone, disjoint keyword sets and coordinate ranges.

use std::collections::HashSet;

use chrono_tz::Tz;

use crate::diagnostic::ConfigError;
use crate::model::CanteiroConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CanteiroConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.schedule.timezone.parse::<Tz>().is_err() {
        fail(format!(
            "schedule.timezone `{}` is not a valid IANA timezone",
            config.schedule.timezone
        ));
    }

    for (key, value) in [
        ("schedule.tick_interval_secs", config.schedule.tick_interval_secs),
        ("dialogue.idle_timeout_secs", config.dialogue.idle_timeout_secs),
        ("dialogue.sweep_interval_secs", config.dialogue.sweep_interval_secs),
        ("services.request_timeout_secs", config.services.request_timeout_secs),
        ("whatsapp.request_timeout_secs", config.whatsapp.request_timeout_secs),
        ("whatsapp.restart_timeout_secs", config.whatsapp.restart_timeout_secs),
    ] {
        if value == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    if config.schedule.activity_capacity == 0 {
        fail("schedule.activity_capacity must be greater than zero".to_string());
    }

    if config.whatsapp.reconnect_max_delay_secs < config.whatsapp.reconnect_base_delay_secs {
        fail(format!(
            "whatsapp.reconnect_max_delay_secs ({}) must not be lower than reconnect_base_delay_secs ({})",
            config.whatsapp.reconnect_max_delay_secs, config.whatsapp.reconnect_base_delay_secs
        ));
    }

    for (key, url) in [
        ("whatsapp.bridge_url", &config.whatsapp.bridge_url),
        ("services.base_url", &config.services.base_url),
        ("services.geolocation_url", &config.services.geolocation_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must be an http(s) URL"));
        }
    }

    validate_keywords(config, &mut fail);

    let lat = config.dialogue.fallback_latitude;
    if !(-90.0..=90.0).contains(&lat) {
        fail(format!(
            "dialogue.fallback_latitude must be within [-90, 90], got {lat}"
        ));
    }
    let lon = config.dialogue.fallback_longitude;
    if !(-180.0..=180.0).contains(&lon) {
        fail(format!(
            "dialogue.fallback_longitude must be within [-180, 180], got {lon}"
        ));
    }

    if config.gateway.host.trim().is_empty() {
        fail("gateway.host must not be empty".to_string());
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be blank when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_keywords(config: &CanteiroConfig, fail: &mut impl FnMut(String)) {
    let ticket: HashSet<String> = config
        .dialogue
        .ticket_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .collect();
    let attendance: HashSet<String> = config
        .dialogue
        .attendance_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .collect();

    if ticket.is_empty() || ticket.contains("") {
        fail("dialogue.ticket_keywords must contain at least one non-empty keyword".to_string());
    }
    if attendance.is_empty() || attendance.contains("") {
        fail(
            "dialogue.attendance_keywords must contain at least one non-empty keyword"
                .to_string(),
        );
    }

    let mut shared: Vec<_> = ticket.intersection(&attendance).cloned().collect();
    shared.sort();
    if !shared.is_empty() {
        fail(format!(
            "keywords {shared:?} appear in both dialogue.ticket_keywords and dialogue.attendance_keywords"
        ));
    }

    if ticket.contains("cancelar") || attendance.contains("cancelar") {
        fail("`cancelar` is reserved and cannot be a trigger keyword".to_string());
    }
}
