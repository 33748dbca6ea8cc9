// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review channel trait for the human-in-the-loop chat integration.

use async_trait::async_trait;

use crate::error::PressdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Draft, InboundAction, NotificationRef, Request};

/// Adapter for the chat surface where a reviewer approves, edits or rejects drafts.
#[async_trait]
pub trait ReviewChannel: PluginAdapter {
    /// Establishes the connection and starts delivering inbound actions.
    async fn connect(&mut self) -> Result<(), PressdeskError>;

    /// Posts a review card for one draft version.
    async fn notify(
        &self,
        request: &Request,
        draft: &Draft,
    ) -> Result<NotificationRef, PressdeskError>;

    /// Posts plain text into a conversation.
    async fn inform(&self, conversation_id: &str, text: &str) -> Result<(), PressdeskError>;

    /// Posts plain text into the default review conversation.
    async fn alert(&self, text: &str) -> Result<(), PressdeskError>;

    /// Waits for the next reviewer action from the bounded inbound queue.
    async fn receive(&self) -> Result<InboundAction, PressdeskError>;
}
