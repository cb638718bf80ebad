// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnect policy for the bridge session.

use std::time::Duration;

use canteiro_config::model::WhatsAppConfig;

/// Disconnect reasons after which restarting the session cannot help; the
/// operator has to pair the device again.
const TERMINAL_REASONS: &[&str] = &["LOGOUT", "UNPAIRED", "UNPAIRED_IDLE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub restart_timeout: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &WhatsAppConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_delay: Duration::from_secs(config.reconnect_base_delay_secs),
            max_delay: Duration::from_secs(config.reconnect_max_delay_secs),
            restart_timeout: Duration::from_secs(config.restart_timeout_secs),
        }
    }

    /// Delay before attempt `attempt` (1-based): base, 2×base, 4×base, … capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&WhatsAppConfig::default())
    }
}

pub fn is_recoverable(reason: &str) -> bool {
    let reason = reason.trim();
    !TERMINAL_REASONS
        .iter()
        .any(|terminal| reason.eq_ignore_ascii_case(terminal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            restart_timeout: Duration::from_secs(10),
        };
        let delays: Vec<u64> = (1..=7).map(|a| policy.delay(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(policy.delay(200), Duration::from_secs(60));
    }

    #[test]
    fn default_policy_matches_config_defaults() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.restart_timeout, Duration::from_secs(10));
    }

    #[test]
    fn logout_is_terminal() {
        assert!(!is_recoverable("LOGOUT"));
        assert!(!is_recoverable("unpaired"));
        assert!(is_recoverable("NAVIGATION"));
        assert!(is_recoverable("browser crashed"));
        assert!(is_recoverable(""));
    }
}
