// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `canteiro config check` command implementation.

use std::path::Path;

use canteiro_config::{CanteiroConfig, ConfigError};

/// Loads and validates the configuration, printing diagnostics or a summary.
///
/// Returns whether the configuration is valid.
pub fn run_check(path: Option<&Path>) -> bool {
    match load(path) {
        Ok(config) => {
            println!("configuration is valid");
            for line in summary(&config) {
                println!("  {line}");
            }
            true
        }
        Err(errors) => {
            canteiro_config::render_errors(&errors);
            eprintln!("{} configuration error(s) found", errors.len());
            false
        }
    }
}

fn load(path: Option<&Path>) -> Result<CanteiroConfig, Vec<ConfigError>> {
    let Some(path) = path else {
        return canteiro_config::load_and_validate();
    };
    match std::fs::read_to_string(path) {
        Ok(content) => canteiro_config::load_and_validate_str(&content),
        Err(e) => Err(vec![ConfigError::Other(format!(
            "cannot read {}: {e}",
            path.display()
        ))]),
    }
}

/// One line per setting an operator usually wants to confirm.
fn summary(config: &CanteiroConfig) -> Vec<String> {
    let gateway = if config.gateway.enabled {
        let auth = if config.gateway.bearer_token.is_some() {
            "bearer token set"
        } else {
            "no bearer token, /v1 disabled"
        };
        format!(
            "gateway:   http://{}:{} ({auth})",
            config.gateway.host, config.gateway.port
        )
    } else {
        "gateway:   disabled".to_string()
    };

    vec![
        format!("bot:       {} (log level {})", config.bot.name, config.bot.log_level),
        format!("whatsapp:  {}", config.whatsapp.bridge_url),
        format!("services:  {}", config.services.base_url),
        format!("storage:   {}", config.storage.database_path),
        format!(
            "schedule:  {} (tick {}s, send delay {}ms)",
            config.schedule.timezone,
            config.schedule.tick_interval_secs,
            config.schedule.send_delay_ms
        ),
        gateway,
    ]
}
