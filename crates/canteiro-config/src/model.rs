// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Canteiro bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Canteiro configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CanteiroConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// WhatsApp bridge connection settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Downstream ERP/backoffice HTTP services.
    #[serde(default)]
    pub services: ServicesConfig,

    /// Conversation flow settings.
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Broadcast scheduling settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Management HTTP API settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and the status endpoint.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "canteiro".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WhatsApp bridge configuration.
///
/// The bridge is a sidecar process owning the WhatsApp Web session. It
/// accepts commands over HTTP and pushes events to the gateway webhook.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Base URL of the bridge HTTP API.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Bearer token sent to the bridge.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Shared secret for HMAC-SHA256 signatures on webhook events.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Per-request timeout for bridge calls, in seconds.
    #[serde(default = "default_bridge_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum reconnect attempts after a recoverable disconnect.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Initial reconnect backoff in seconds; doubles on every attempt.
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_secs: u64,

    /// Upper bound for the reconnect backoff in seconds.
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_secs: u64,

    /// Timeout for a session restart on the bridge, in seconds.
    #[serde(default = "default_restart_timeout")]
    pub restart_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            api_token: None,
            webhook_secret: None,
            request_timeout_secs: default_bridge_request_timeout(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_secs: default_reconnect_base_delay(),
            reconnect_max_delay_secs: default_reconnect_max_delay(),
            restart_timeout_secs: default_restart_timeout(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_bridge_request_timeout() -> u64 {
    15
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay() -> u64 {
    2
}

fn default_reconnect_max_delay() -> u64 {
    60
}

fn default_restart_timeout() -> u64 {
    10
}

/// Downstream services configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesConfig {
    /// Base URL of the backoffice API (clients, tickets, attendance, sites).
    #[serde(default = "default_services_base_url")]
    pub base_url: String,

    /// Bearer token for the backoffice API.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_services_timeout")]
    pub request_timeout_secs: u64,

    /// ip-api compatible geolocation endpoint.
    #[serde(default = "default_geolocation_url")]
    pub geolocation_url: String,

    /// Timeout for the IP geolocation step, in seconds.
    #[serde(default = "default_geolocation_timeout")]
    pub geolocation_timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: default_services_base_url(),
            api_token: None,
            request_timeout_secs: default_services_timeout(),
            geolocation_url: default_geolocation_url(),
            geolocation_timeout_secs: default_geolocation_timeout(),
        }
    }
}

fn default_services_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_services_timeout() -> u64 {
    10
}

fn default_geolocation_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_geolocation_timeout() -> u64 {
    5
}

/// Conversation flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DialogueConfig {
    /// Words that start (or restart) the ticket flow.
    #[serde(default = "default_ticket_keywords")]
    pub ticket_keywords: Vec<String>,

    /// Words that start (or restart) the attendance flow.
    #[serde(default = "default_attendance_keywords")]
    pub attendance_keywords: Vec<String>,

    /// Inactivity after which a conversation is discarded, in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Interval between idle sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// How long to wait for a live location share, in seconds.
    #[serde(default = "default_location_wait")]
    pub location_wait_secs: u64,

    /// Latitude used when every other location source failed.
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,

    /// Longitude used when every other location source failed.
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,

    /// Technician assigned to tickets when the contact has none.
    #[serde(default = "default_technician")]
    pub default_technician: String,

    /// Origin recorded on tickets created through the bot.
    #[serde(default = "default_origin")]
    pub default_origin: String,

    /// Category recorded on tickets created through the bot.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Reply with the success text even when ticket submission fails.
    #[serde(default = "default_mask_ticket_failures")]
    pub mask_ticket_failures: bool,

    /// Grace period for in-flight messages at shutdown, in seconds.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            ticket_keywords: default_ticket_keywords(),
            attendance_keywords: default_attendance_keywords(),
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            location_wait_secs: default_location_wait(),
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
            default_technician: default_technician(),
            default_origin: default_origin(),
            default_category: default_category(),
            mask_ticket_failures: default_mask_ticket_failures(),
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

impl DialogueConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn location_wait(&self) -> Duration {
        Duration::from_secs(self.location_wait_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn default_ticket_keywords() -> Vec<String> {
    ["pedido", "ticket", "assistencia", "avaria"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_attendance_keywords() -> Vec<String> {
    ["ponto", "presenca"].into_iter().map(String::from).collect()
}

fn default_idle_timeout() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    5 * 60
}

fn default_location_wait() -> u64 {
    15
}

// Lisbon city centre.
fn default_fallback_latitude() -> f64 {
    38.7223
}

fn default_fallback_longitude() -> f64 {
    -9.1393
}

fn default_technician() -> String {
    "000".to_string()
}

fn default_origin() -> String {
    "WHATSAPP".to_string()
}

fn default_category() -> String {
    "ASSISTENCIA".to_string()
}

fn default_mask_ticket_failures() -> bool {
    true
}

fn default_drain_timeout() -> u64 {
    30
}

/// Broadcast scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// IANA timezone in which fire times and "today" are evaluated.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Period of each schedule's timer, in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Pause after each broadcast send attempt, in milliseconds.
    #[serde(default = "default_send_delay")]
    pub send_delay_ms: u64,

    /// Number of activity log entries kept in memory.
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            tick_interval_secs: default_tick_interval(),
            send_delay_ms: default_send_delay(),
            activity_capacity: default_activity_capacity(),
        }
    }
}

impl ScheduleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }
}

fn default_timezone() -> String {
    "Europe/Lisbon".to_string()
}

fn default_tick_interval() -> u64 {
    60
}

fn default_send_delay() -> u64 {
    2500
}

fn default_activity_capacity() -> usize {
    500
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("canteiro").join("canteiro.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("canteiro.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Management HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the management API.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Bind address.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operational_values() {
        let config = CanteiroConfig::default();
        assert_eq!(config.dialogue.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(config.dialogue.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.dialogue.location_wait(), Duration::from_secs(15));
        assert_eq!(config.schedule.timezone, "Europe/Lisbon");
        assert_eq!(config.schedule.tick_interval(), Duration::from_secs(60));
        assert_eq!(config.schedule.send_delay(), Duration::from_millis(2500));
        assert_eq!(config.schedule.activity_capacity, 500);
        assert!(config.dialogue.mask_ticket_failures);
    }

    #[test]
    fn default_database_path_ends_with_canteiro_db() {
        assert!(StorageConfig::default().database_path.ends_with("canteiro.db"));
    }
}
