// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language-model backed collaborators: draft generation and relevance judging.

use async_trait::async_trait;

use crate::error::PressdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GeneratedDraft, RawMessage, RelevanceVerdict, Request};

/// Produces a reply draft for a request.
#[async_trait]
pub trait DraftGenerator: PluginAdapter {
    /// Generates a subject and body. Fails with [`PressdeskError::Generation`]
    /// or [`PressdeskError::Transient`], both retryable.
    async fn generate(&self, request: &Request) -> Result<GeneratedDraft, PressdeskError>;
}

/// Decides whether a parsed digest item is worth answering at all.
#[async_trait]
pub trait RelevanceJudge: PluginAdapter {
    async fn judge(&self, message: &RawMessage) -> Result<RelevanceVerdict, PressdeskError>;
}
