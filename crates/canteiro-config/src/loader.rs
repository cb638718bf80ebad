// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./canteiro.toml` > `~/.config/canteiro/canteiro.toml`
//! > `/etc/canteiro/canteiro.toml` with environment variable overrides via the
//! `CANTEIRO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CanteiroConfig;

/// Config sections, in the form used for environment variable mapping.
const SECTIONS: &[&str] = &[
    "bot",
    "whatsapp",
    "services",
    "dialogue",
    "schedule",
    "storage",
    "gateway",
];

pub const SYSTEM_CONFIG_PATH: &str = "/etc/canteiro/canteiro.toml";
pub const LOCAL_CONFIG_PATH: &str = "canteiro.toml";

/// `~/.config/canteiro/canteiro.toml`, when a config dir is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("canteiro/canteiro.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/canteiro/canteiro.toml` (system-wide)
/// 3. `~/.config/canteiro/canteiro.toml` (user XDG config)
/// 4. `./canteiro.toml` (local directory)
/// 5. `CANTEIRO_*` environment variables
pub fn load_config() -> Result<CanteiroConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<CanteiroConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CanteiroConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CanteiroConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CanteiroConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CanteiroConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider mapping `CANTEIRO_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CANTEIRO_WHATSAPP_BRIDGE_URL` maps to `whatsapp.bridge_url`.
fn env_provider() -> Env {
    Env::prefixed("CANTEIRO_").map(|key| {
        let key_str = key.as_str();
        SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
