// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup: `./pressdesk.toml` > `~/.config/pressdesk/pressdesk.toml` >
//! `/etc/pressdesk/pressdesk.toml`, with `PRESSDESK_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PressdeskConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/pressdesk/pressdesk.toml";
pub(crate) const LOCAL_CONFIG: &str = "pressdesk.toml";

/// Config sections that may be targeted by environment variables. Longest
/// names first so `retry_generation_` wins over a shorter prefix.
const ENV_SECTIONS: &[&str] = &[
    "retry_generation",
    "retry_delivery",
    "telegram",
    "delivery",
    "service",
    "storage",
    "review",
    "filter",
    "gemini",
    "gmail",
    "reply",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pressdesk/pressdesk.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pressdesk/pressdesk.toml`
/// 3. `~/.config/pressdesk/pressdesk.toml`
/// 4. `./pressdesk.toml`
/// 5. `PRESSDESK_*` environment variables
pub fn load_config() -> Result<PressdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PressdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PressdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PressdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PressdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PressdeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env key to a dotted config path.
///
/// Uses an explicit section table rather than splitting on `_`, since key
/// names contain underscores: `telegram_bot_token` must become
/// `telegram.bot_token`, and `retry_delivery_max_attempts` must become
/// `retry.delivery.max_attempts`.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            let dotted = section.replacen('_', ".", 1);
            return format!("{dotted}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("PRESSDESK_").map(|key| map_env_key(key.as_str()).into())
}
