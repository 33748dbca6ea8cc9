// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Pressdesk responder.

use thiserror::Error;

use crate::types::{DraftId, DraftStatus, RequestId};

/// The primary error type used across all Pressdesk adapter traits and core operations.
///
/// Collaborator failures are translated into one of these variants at the
/// adapter boundary, so triage logic never reasons about transport details.
#[derive(Debug, Error)]
pub enum PressdeskError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Mailbox rejected our credentials. Never retried; surfaced to the operator.
    #[error("mailbox authentication failed: {message}")]
    Auth { message: String },

    /// A collaborator call failed in a way that may succeed on retry
    /// (network error, quota, 5xx).
    #[error("transient failure: {message}")]
    Transient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A collaborator refused the request outright (malformed recipient, 4xx).
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// Draft generation failed. Retryable a bounded number of times.
    #[error("draft generation failed: {message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Review channel errors (bot API failure, message format).
    #[error("review channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A reviewer action targeted a draft version that is no longer active or
    /// has already been transitioned.
    #[error("stale action on draft {draft_id}: draft is {status}")]
    StaleAction { draft_id: DraftId, status: DraftStatus },

    /// The request already has a non-terminal draft.
    #[error("request {request_id} already has an active draft")]
    ActiveDraftExists { request_id: RequestId },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PressdeskError {
    /// Whether a retry policy may attempt the failed operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PressdeskError::Transient { .. }
                | PressdeskError::Generation { .. }
                | PressdeskError::Timeout { .. }
        )
    }

    /// Shorthand for a [`PressdeskError::Transient`] without a source.
    pub fn transient(message: impl Into<String>) -> Self {
        PressdeskError::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`PressdeskError::Generation`] without a source.
    pub fn generation(message: impl Into<String>) -> Self {
        PressdeskError::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`PressdeskError::Channel`] without a source.
    pub fn channel(message: impl Into<String>) -> Self {
        PressdeskError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any storage-layer error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        PressdeskError::Storage {
            source: Box::new(source),
        }
    }
}
