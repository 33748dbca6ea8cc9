// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gmail REST API.
//!
//! Provides [`GmailClient`] which exchanges the configured refresh token for
//! short-lived access tokens (cached until shortly before expiry) and maps
//! HTTP failures onto the shared error taxonomy: 401/403 are `Auth`, 429 and
//! 5xx are `Transient`, other 4xx are `Rejected`.

use std::time::{Duration, Instant};

use pressdesk_config::model::GmailConfig;
use pressdesk_core::PressdeskError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::types::{
    ApiErrorResponse, GmailMessage, LabelList, MessageList, ModifyRequest, Profile, SendRequest,
    SentMessage, TokenResponse,
};

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Authenticated Gmail API client.
#[derive(Debug)]
pub struct GmailClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    user_id: String,
    credentials: Credentials,
    token: Mutex<Option<CachedToken>>,
}

fn required(value: &Option<String>, key: &str) -> Result<String, PressdeskError> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| PressdeskError::Config(format!("gmail.{key} is required")))
}

impl GmailClient {
    /// Fails with `Config` when any OAuth credential is missing.
    pub fn new(config: &GmailConfig) -> Result<Self, PressdeskError> {
        let credentials = Credentials {
            client_id: required(&config.client_id, "client_id")?,
            client_secret: required(&config.client_secret, "client_secret")?,
            refresh_token: required(&config.refresh_token, "refresh_token")?,
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PressdeskError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            user_id: config.user_id.clone(),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// A valid access token, refreshing it when missing or about to expire.
    pub async fn access_token(&self) -> Result<String, PressdeskError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("client_secret", &self.credentials.client_secret)
            .append_pair("refresh_token", &self.credentials.refresh_token)
            .append_pair("grant_type", "refresh_token")
            .finish();
        let response = self
            .http
            .post(&self.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        if !status.is_success() {
            // A rejected refresh token is never going to start working.
            let err = classify(status, &body, "token refresh");
            return Err(match err {
                PressdeskError::Rejected { message } => PressdeskError::Auth { message },
                other => other,
            });
        }
        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            PressdeskError::transient(format!("malformed token response: {e}"))
        })?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = token.expires_in, "refreshed Gmail access token");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, PressdeskError> {
        let mut url = Url::parse(&format!(
            "{}/users/{}/{}",
            self.api_base, self.user_id, path
        ))
        .map_err(|e| PressdeskError::Config(format!("invalid gmail.api_base: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        operation: &str,
    ) -> Result<T, PressdeskError> {
        let token = self.access_token().await?;
        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        debug!(status = %status, operation, "gmail response received");

        if status == StatusCode::UNAUTHORIZED {
            // Drop the cached token so the next call refreshes it.
            self.token.lock().await.take();
        }
        let text = response.text().await.map_err(network_error)?;
        if !status.is_success() {
            return Err(classify(status, &text, operation));
        }
        serde_json::from_str(&text).map_err(|e| {
            PressdeskError::Internal(format!("malformed {operation} response: {e}"))
        })
    }

    /// All labels of the mailbox.
    pub async fn list_labels(&self) -> Result<LabelList, PressdeskError> {
        let url = self.url("labels", &[])?;
        self.call::<(), _>(Method::GET, url, None, "labels.list").await
    }

    /// Ids of messages carrying `label_id`, newest first.
    pub async fn list_messages(
        &self,
        label_id: &str,
        unread_only: bool,
        max_results: u32,
    ) -> Result<MessageList, PressdeskError> {
        let max = max_results.to_string();
        let mut query = vec![("labelIds", label_id), ("maxResults", max.as_str())];
        if unread_only {
            query.push(("q", "is:unread"));
        }
        let url = self.url("messages", &query)?;
        self.call::<(), _>(Method::GET, url, None, "messages.list").await
    }

    pub async fn get_message(&self, id: &str) -> Result<GmailMessage, PressdeskError> {
        let url = self.url(&format!("messages/{id}"), &[("format", "full")])?;
        self.call::<(), _>(Method::GET, url, None, "messages.get").await
    }

    /// Remove the `UNREAD` label.
    pub async fn mark_read(&self, id: &str) -> Result<(), PressdeskError> {
        let url = self.url(&format!("messages/{id}/modify"), &[])?;
        let body = ModifyRequest {
            remove_label_ids: vec!["UNREAD".to_string()],
        };
        let _: serde_json::Value = self
            .call(Method::POST, url, Some(&body), "messages.modify")
            .await?;
        Ok(())
    }

    /// Send a raw, already base64url-encoded message.
    pub async fn send_raw(&self, request: &SendRequest) -> Result<SentMessage, PressdeskError> {
        let url = self.url("messages/send", &[])?;
        self.call(Method::POST, url, Some(request), "messages.send")
            .await
    }

    /// Address of the authorized account.
    pub async fn profile(&self) -> Result<Profile, PressdeskError> {
        let url = self.url("profile", &[])?;
        self.call::<(), _>(Method::GET, url, None, "getProfile").await
    }
}

fn network_error(e: reqwest::Error) -> PressdeskError {
    PressdeskError::Transient {
        message: format!("Gmail request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn classify(status: StatusCode, body: &str, operation: &str) -> PressdeskError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.describe())
        .unwrap_or_else(|_| body.chars().take(200).collect());
    let message = format!("Gmail {operation} returned {status}: {detail}");
    match status.as_u16() {
        401 | 403 => PressdeskError::Auth { message },
        429 | 500..=599 => PressdeskError::transient(message),
        _ => PressdeskError::Rejected { message },
    }
}
