// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword include/exclude filtering of digest items.

use pressdesk_config::model::FilterConfig;

/// Case-insensitive substring filter.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

fn normalize(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl KeywordFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(&config.include_keywords, &config.exclude_keywords)
    }

    /// Whether `blob` passes: it mentions an include keyword (when any are
    /// configured) and no exclude keyword.
    pub fn accepts(&self, blob: &str) -> bool {
        let text = blob.to_lowercase();
        if !self.include.is_empty() && !self.include.iter().any(|k| text.contains(k.as_str())) {
            return false;
        }
        !self.exclude.iter().any(|k| text.contains(k.as_str()))
    }
}
