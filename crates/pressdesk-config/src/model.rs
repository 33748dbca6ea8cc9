// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Pressdesk responder.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Pressdesk configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults sensibly;
/// credentials have no defaults and are checked when adapters are built.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PressdeskConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Gmail mailbox settings.
    #[serde(default)]
    pub gmail: GmailConfig,

    /// Gemini draft generator settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Keyword and relevance filtering of digest items.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Telegram review channel settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry policies for generation and delivery.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Outbound email settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Reviewer interaction settings.
    #[serde(default)]
    pub review: ReviewConfig,

    /// Reply composition settings.
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between mailbox polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Capacity of the bounded reviewer action queue.
    #[serde(default = "default_action_queue_capacity")]
    pub action_queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            poll_interval_secs: default_poll_interval_secs(),
            action_queue_capacity: default_action_queue_capacity(),
        }
    }
}

fn default_service_name() -> String {
    "pressdesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_action_queue_capacity() -> usize {
    100
}

/// Gmail API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GmailConfig {
    /// Label whose messages are source requests.
    #[serde(default = "default_label")]
    pub label: String,

    /// Mailbox owner, `me` for the authorized account.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// OAuth client id.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Long-lived OAuth refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_gmail_api_base")]
    pub api_base: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Maximum messages listed per poll.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Only list unread messages.
    #[serde(default = "default_true")]
    pub unread_only: bool,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            user_id: default_user_id(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_base: default_gmail_api_base(),
            token_url: default_token_url(),
            max_results: default_max_results(),
            unread_only: true,
        }
    }
}

fn default_label() -> String {
    "HARO/HelpAB2BWriter".to_string()
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_max_results() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. Can also be set via `PRESSDESK_GEMINI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Model tried when the primary model fails.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: Option<String>,

    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// Prompt template with `{{placeholder}}` fields. Built-in template when unset.
    #[serde(default)]
    pub prompt_template_file: Option<String>,

    /// Upper bound on a single generation call, in seconds.
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            fallback_model: default_fallback_model(),
            api_base: default_gemini_api_base(),
            prompt_template_file: None,
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_fallback_model() -> Option<String> {
    Some("gemini-1.5-flash".to_string())
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    60
}

/// Filtering of digest items before a request is created.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// When non-empty, a digest item must mention at least one of these.
    #[serde(default)]
    pub include_keywords: Vec<String>,

    /// A digest item mentioning any of these is skipped.
    #[serde(default)]
    pub exclude_keywords: Vec<String>,

    /// Ask the language model whether a HARO item is relevant.
    #[serde(default)]
    pub relevance_enabled: bool,

    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            relevance_enabled: false,
            relevance_threshold: default_relevance_threshold(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_relevance_threshold() -> f64 {
    0.85
}

fn default_confidence_threshold() -> f64 {
    0.75
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat where review cards are posted.
    #[serde(default)]
    pub chat_id: Option<i64>,

    /// User ids or usernames allowed to act. Empty allows any member of the chat.
    #[serde(default)]
    pub allowed_users: Vec<String>,

    /// Review cards longer than this are truncated.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            allowed_users: Vec::new(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

fn default_max_message_chars() -> usize {
    3800
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("pressdesk").join("pressdesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("pressdesk.db"))
        .to_string_lossy()
        .into_owned()
}

/// Retry policies, one per retried operation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default)]
    pub generation: RetrySection,

    #[serde(default)]
    pub delivery: RetrySection,
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Randomize each delay within its upper half.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Upper bound on a single send call, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// `From` header of replies. The authorized account is used when unset.
    #[serde(default)]
    pub from_address: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            from_address: None,
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Reviewer interaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    /// How long a reviewer has to send edited text after pressing Edit.
    #[serde(default = "default_edit_timeout_secs")]
    pub edit_timeout_secs: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            edit_timeout_secs: default_edit_timeout_secs(),
        }
    }
}

fn default_edit_timeout_secs() -> u64 {
    1_800
}

/// Reply composition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyConfig {
    /// Closing line placed before the signature.
    #[serde(default = "default_closing")]
    pub closing: String,

    /// Signature block appended to every reply.
    #[serde(default)]
    pub signature: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            closing: default_closing(),
            signature: String::new(),
        }
    }
}

fn default_closing() -> String {
    "Best regards,".to_string()
}
