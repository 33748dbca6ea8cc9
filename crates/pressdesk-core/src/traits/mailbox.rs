// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox adapter trait for the inbound/outbound email account.

use async_trait::async_trait;

use crate::error::PressdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{OutboundEmail, RawMessage, SentEmail};

/// Adapter for the mailbox that receives source requests and sends replies.
///
/// Errors are either [`PressdeskError::Auth`] (never retried),
/// [`PressdeskError::Rejected`] (never retried) or
/// [`PressdeskError::Transient`].
#[async_trait]
pub trait MailboxAdapter: PluginAdapter {
    /// Lists messages carrying the configured label that have not been
    /// acknowledged yet, already parsed into request fields.
    async fn list_new_labeled_messages(&self) -> Result<Vec<RawMessage>, PressdeskError>;

    /// Marks a mailbox message as processed so it is not listed again.
    async fn acknowledge(&self, mailbox_message_id: &str) -> Result<(), PressdeskError>;

    /// Sends an email, threading it when `thread_id` / `in_reply_to` are set.
    async fn send(&self, email: &OutboundEmail) -> Result<SentEmail, PressdeskError>;
}
