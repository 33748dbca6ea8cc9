// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All errors are
//! collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::{PressdeskConfig, RetrySection};

/// Validate a deserialized configuration.
pub fn validate_config(config: &PressdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &str, message: String| {
        errors.push(ConfigError::Validation {
            key: key.to_string(),
            message,
        });
    };

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path", "must not be empty".into());
    }

    if config.gmail.label.trim().is_empty() {
        fail("gmail.label", "must not be empty".into());
    }

    if config.gmail.max_results == 0 {
        fail("gmail.max_results", "must be at least 1".into());
    }

    if config.service.poll_interval_secs < 1 {
        fail("service.poll_interval_secs", "must be at least 1".into());
    }

    if config.service.action_queue_capacity < 1 {
        fail("service.action_queue_capacity", "must be at least 1".into());
    }

    for (name, section) in [
        ("retry.generation", &config.retry.generation),
        ("retry.delivery", &config.retry.delivery),
    ] {
        check_retry(name, section, &mut fail);
    }

    for (key, value) in [
        ("filter.relevance_threshold", config.filter.relevance_threshold),
        ("filter.confidence_threshold", config.filter.confidence_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            fail(key, format!("must be between 0 and 1, got {value}"));
        }
    }

    if config.gemini.timeout_secs == 0 {
        fail("gemini.timeout_secs", "must be at least 1".into());
    }

    if config.delivery.send_timeout_secs == 0 {
        fail("delivery.send_timeout_secs", "must be at least 1".into());
    }

    if config.review.edit_timeout_secs == 0 {
        fail("review.edit_timeout_secs", "must be at least 1".into());
    }

    // Room for the truncation marker on review cards.
    if config.telegram.max_message_chars < 200 || config.telegram.max_message_chars > 4096 {
        fail(
            "telegram.max_message_chars",
            format!(
                "must be between 200 and 4096, got {}",
                config.telegram.max_message_chars
            ),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retry(name: &str, section: &RetrySection, fail: &mut impl FnMut(&str, String)) {
    if section.max_attempts < 1 {
        fail(&format!("{name}.max_attempts"), "must be at least 1".into());
    }
    if section.base_delay_ms > section.max_delay_ms {
        fail(
            &format!("{name}.base_delay_ms"),
            format!(
                "must not exceed max_delay_ms ({} > {})",
                section.base_delay_ms, section.max_delay_ms
            ),
        );
    }
}
