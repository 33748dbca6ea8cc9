// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini collaborators for the Pressdesk responder.
//!
//! [`GeminiGenerator`] implements [`DraftGenerator`]: it renders the prompt
//! template for a request, asks Gemini for a subject and body, and shapes the
//! answer into a reply. [`GeminiRelevanceJudge`] implements the optional
//! relevance check for digest items.

pub mod client;
pub mod compose;
pub mod judge;
pub mod prompt;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use pressdesk_config::PressdeskConfig;
use pressdesk_config::model::{GeminiConfig, ReplyConfig};
use pressdesk_core::error::PressdeskError;
use pressdesk_core::traits::{DraftGenerator, PluginAdapter};
use pressdesk_core::types::{AdapterType, GeneratedDraft, HealthStatus, Request};
use tracing::{debug, info};

pub use client::GeminiClient;
pub use judge::GeminiRelevanceJudge;

/// Gemini draft generator implementing [`DraftGenerator`].
///
/// API key resolution order: `gemini.api_key` -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiGenerator {
    client: GeminiClient,
    template: String,
    reply: ReplyConfig,
}

impl GeminiGenerator {
    pub async fn new(config: &PressdeskConfig) -> Result<Self, PressdeskError> {
        let api_key = resolve_api_key(&config.gemini.api_key)?;
        let client = GeminiClient::new(
            &api_key,
            &config.gemini.api_base,
            model_chain(&config.gemini),
            Duration::from_secs(config.gemini.timeout_secs),
        )?;
        let template = prompt::load_template(config.gemini.prompt_template_file.as_deref()).await;
        info!(models = ?client.models(), "Gemini generator initialized");
        Ok(Self::with_client(client, template, config.reply.clone()))
    }

    pub fn with_client(client: GeminiClient, template: String, reply: ReplyConfig) -> Self {
        Self {
            client,
            template,
            reply,
        }
    }
}

/// Primary model followed by the fallback model, if it differs.
pub(crate) fn model_chain(config: &GeminiConfig) -> Vec<String> {
    let mut models = vec![config.model.clone()];
    if let Some(fallback) = config
        .fallback_model
        .as_ref()
        .filter(|m| !m.is_empty() && **m != config.model)
    {
        models.push(fallback.clone());
    }
    models
}

pub(crate) fn resolve_api_key(config_key: &Option<String>) -> Result<String, PressdeskError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY").map_err(|_| {
        PressdeskError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )
    })
}

#[async_trait]
impl PluginAdapter for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        debug!("Gemini generator shutting down");
        Ok(())
    }
}

#[async_trait]
impl DraftGenerator for GeminiGenerator {
    async fn generate(&self, request: &Request) -> Result<GeneratedDraft, PressdeskError> {
        let prompt = prompt::render_for(&self.template, request);
        let (model, text) = self.client.generate(&prompt, true).await?;
        let raw = compose::parse_model_output(&text, &format!("Re: {}", request.subject));
        if raw.body.trim().is_empty() {
            return Err(PressdeskError::generation("Gemini returned an empty body"));
        }
        let body = compose::compose_body(
            &raw.body,
            request.requester_name.as_deref(),
            &self.reply,
            &mut rand::thread_rng(),
        );
        debug!(request_id = %request.id, model = %model, "draft generated");
        Ok(GeneratedDraft {
            subject: raw.subject,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_from_config() {
        assert_eq!(resolve_api_key(&Some("g-key".into())).unwrap(), "g-key");
    }

    #[test]
    fn resolve_api_key_none_falls_back_to_env() {
        let result = resolve_api_key(&None);
        if let Err(e) = result {
            assert!(e.to_string().contains("API key not found"), "got: {e}");
        }
    }

    #[test]
    fn fallback_model_is_appended_once() {
        let mut config = GeminiConfig::default();
        config.model = "a".into();
        config.fallback_model = Some("b".into());
        assert_eq!(model_chain(&config), vec!["a", "b"]);
        config.fallback_model = Some("a".into());
        assert_eq!(model_chain(&config), vec!["a"]);
        config.fallback_model = None;
        assert_eq!(model_chain(&config), vec!["a"]);
    }
}
