// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! Provides [`GeminiClient`] which authenticates with an API key header and
//! tries the primary model first, then the fallback model.

use std::time::Duration;

use pressdesk_core::PressdeskError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, GenerateRequest, GenerateResponse};

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    models: Vec<String>,
}

impl GeminiClient {
    /// `models` are tried in order; the first is the primary model.
    pub fn new(
        api_key: &str,
        api_base: &str,
        models: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, PressdeskError> {
        if models.is_empty() {
            return Err(PressdeskError::Config("gemini.model cannot be empty".into()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                PressdeskError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| PressdeskError::Generation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            models,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Generate text, falling back through the configured models. Returns the
    /// model that answered along with its text.
    pub async fn generate(
        &self,
        prompt: &str,
        json_output: bool,
    ) -> Result<(String, String), PressdeskError> {
        self.first_success(prompt, json_output, |text| Ok(text.to_string()))
            .await
    }

    /// Like [`generate`](Self::generate), but a model whose answer does not
    /// parse as `T` counts as failed and the next model is tried.
    pub async fn generate_json<T>(&self, prompt: &str) -> Result<(String, T), PressdeskError>
    where
        T: DeserializeOwned + Send,
    {
        self.first_success(prompt, true, |text| {
            serde_json::from_str(strip_code_fence(text)).map_err(|e| {
                PressdeskError::generation(format!("Gemini answer is not the expected JSON: {e}"))
            })
        })
        .await
    }

    async fn first_success<T, F>(
        &self,
        prompt: &str,
        json_output: bool,
        parse: F,
    ) -> Result<(String, T), PressdeskError>
    where
        T: Send,
        F: Fn(&str) -> Result<T, PressdeskError> + Send + Sync,
    {
        let request = GenerateRequest::prompt(prompt, json_output);
        let mut last_error = None;
        for model in &self.models {
            let outcome = match self.generate_with(model, &request).await {
                Ok(text) => parse(&text),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(value) => return Ok((model.clone(), value)),
                Err(e) => {
                    warn!(model = %model, error = %e, "Gemini model failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| PressdeskError::generation("no Gemini model configured")))
    }

    async fn generate_with(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, PressdeskError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| PressdeskError::Transient {
                message: format!("Gemini request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model, "Gemini response received");
        let body = response.text().await.map_err(|e| PressdeskError::Transient {
            message: format!("failed to read Gemini response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| match e.error.status {
                    Some(s) => format!("{s}: {}", e.error.message),
                    None => e.error.message,
                })
                .unwrap_or_else(|_| body.chars().take(200).collect());
            let message = format!("Gemini {model} returned {status}: {detail}");
            return Err(if is_transient_status(status) {
                PressdeskError::transient(message)
            } else {
                PressdeskError::generation(message)
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            PressdeskError::generation(format!("malformed Gemini response: {e}"))
        })?;
        match parsed.text() {
            Some(text) => Ok(text),
            None => {
                let reason = parsed
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .or_else(|| parsed.candidates.first().and_then(|c| c.finish_reason.clone()))
                    .unwrap_or_else(|| "no candidates".into());
                Err(PressdeskError::generation(format!(
                    "Gemini {model} returned no text ({reason})"
                )))
            }
        }
    }
}

/// Strip a surrounding Markdown code fence (with or without a `json` tag).
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Whether a status code indicates a transient failure worth retrying.
pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}
