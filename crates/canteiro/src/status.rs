// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `canteiro status` command implementation.
//!
//! Queries the gateway health endpoint of a running instance and reports
//! its uptime, WhatsApp session state and registered schedules. A refused
//! connection is reported as "not running", not as an error.

use std::io::IsTerminal;
use std::time::Duration;

use canteiro_config::model::CanteiroConfig;
use canteiro_core::CanteiroError;
use serde::{Deserialize, Serialize};

/// Health endpoint response from the gateway.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    version: Option<String>,
    uptime_secs: u64,
    whatsapp: String,
    schedules_registered: usize,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub version: Option<String>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub whatsapp: Option<String>,
    pub schedules_registered: Option<usize>,
    pub endpoint: String,
}

impl StatusResponse {
    fn offline(endpoint: String) -> Self {
        Self {
            running: false,
            status: "not running".to_string(),
            version: None,
            uptime_secs: None,
            uptime_human: None,
            whatsapp: None,
            schedules_registered: None,
            endpoint,
        }
    }
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Asks `endpoint` for health; any failure means the instance is not running.
async fn probe(endpoint: &str) -> Result<StatusResponse, CanteiroError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| CanteiroError::Internal(format!("failed to create HTTP client: {e}")))?;

    let health = match client.get(endpoint).send().await {
        Ok(resp) if resp.status().is_success() => resp.json::<HealthResponse>().await.map_err(|e| {
            CanteiroError::Internal(format!("failed to parse health response: {e}"))
        })?,
        _ => return Ok(StatusResponse::offline(endpoint.to_string())),
    };

    Ok(StatusResponse {
        running: true,
        uptime_human: Some(format_uptime(health.uptime_secs)),
        status: health.status,
        version: health.version,
        uptime_secs: Some(health.uptime_secs),
        whatsapp: Some(health.whatsapp),
        schedules_registered: Some(health.schedules_registered),
        endpoint: endpoint.to_string(),
    })
}

/// Run the `canteiro status` command.
///
/// `--json` prints structured output for scripting; `--plain` (or a
/// non-TTY stdout) disables colors.
pub async fn run_status(
    config: &CanteiroConfig,
    json: bool,
    plain: bool,
) -> Result<(), CanteiroError> {
    let endpoint = format!(
        "http://{}:{}/health",
        config.gateway.host, config.gateway.port
    );
    let status = probe(&endpoint).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| CanteiroError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, use_color);
    }
    Ok(())
}

fn print_status(status: &StatusResponse, use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  canteiro status");
    println!("  {}", "-".repeat(35));

    if !status.running {
        if use_color {
            println!("    State:    {} {}", "✗".red(), "not running".red());
        } else {
            println!("    State:    [FAIL] not running");
        }
        println!("    Endpoint: {}", status.endpoint);
        println!();
        println!("  Start with: canteiro serve");
        println!();
        return;
    }

    let uptime = status.uptime_human.as_deref().unwrap_or("?");
    if use_color {
        println!(
            "    State:    {} {} (uptime: {uptime})",
            "✓".green(),
            status.status.green()
        );
    } else {
        println!("    State:    [OK] {} (uptime: {uptime})", status.status);
    }

    let whatsapp = status.whatsapp.as_deref().unwrap_or("unknown");
    if use_color {
        let painted = if whatsapp == "ready" {
            whatsapp.green()
        } else {
            whatsapp.yellow()
        };
        println!("    WhatsApp: {painted}");
    } else {
        println!("    WhatsApp: {whatsapp}");
    }
    if let Some(count) = status.schedules_registered {
        println!("    Schedules: {count} active");
    }
    if let Some(version) = &status.version {
        println!("    Version:  {version}");
    }
    println!();
}
