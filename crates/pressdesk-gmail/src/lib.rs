// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gmail mailbox adapter for the Pressdesk responder.
//!
//! Implements [`MailboxAdapter`] over the Gmail REST API: lists unread
//! messages carrying the configured label, parses them into source requests,
//! marks them read once ingested and sends threaded replies.

pub mod client;
pub mod compose;
pub mod decode;
pub mod filter;
pub mod parse;
pub mod types;

use async_trait::async_trait;
use pressdesk_config::model::{DeliveryConfig, FilterConfig, GmailConfig};
use pressdesk_core::error::PressdeskError;
use pressdesk_core::traits::{MailboxAdapter, PluginAdapter};
use pressdesk_core::types::{AdapterType, HealthStatus, OutboundEmail, RawMessage, SentEmail};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub use client::GmailClient;
pub use filter::KeywordFilter;

/// Gmail adapter implementing [`MailboxAdapter`].
pub struct GmailMailbox {
    client: GmailClient,
    label: String,
    unread_only: bool,
    max_results: u32,
    from_address: Option<String>,
    filter: KeywordFilter,
    label_id: OnceCell<String>,
    account: OnceCell<String>,
}

impl GmailMailbox {
    /// Requires the OAuth credentials in `gmail` to be set.
    pub fn new(
        gmail: &GmailConfig,
        filter: &FilterConfig,
        delivery: &DeliveryConfig,
    ) -> Result<Self, PressdeskError> {
        Ok(Self {
            client: GmailClient::new(gmail)?,
            label: gmail.label.clone(),
            unread_only: gmail.unread_only,
            max_results: gmail.max_results,
            from_address: delivery
                .from_address
                .clone()
                .filter(|a| !a.trim().is_empty()),
            filter: KeywordFilter::from_config(filter),
            label_id: OnceCell::new(),
            account: OnceCell::new(),
        })
    }

    pub fn client(&self) -> &GmailClient {
        &self.client
    }

    /// Id of the configured label, looked up by name once.
    async fn label_id(&self) -> Result<&str, PressdeskError> {
        let id = self
            .label_id
            .get_or_try_init(|| async {
                let labels = self.client.list_labels().await?;
                labels
                    .labels
                    .into_iter()
                    .find(|l| l.name == self.label)
                    .map(|l| l.id)
                    .ok_or_else(|| {
                        PressdeskError::Config(format!("Gmail label {:?} not found", self.label))
                    })
            })
            .await?;
        Ok(id.as_str())
    }

    /// `From` address of replies: configured, else the authorized account.
    async fn sender(&self) -> Result<&str, PressdeskError> {
        if let Some(from) = &self.from_address {
            return Ok(from);
        }
        let account = self
            .account
            .get_or_try_init(|| async { Ok::<_, PressdeskError>(self.client.profile().await?.email_address) })
            .await?;
        Ok(account.as_str())
    }
}

#[async_trait]
impl PluginAdapter for GmailMailbox {
    fn name(&self) -> &str {
        "gmail"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailbox
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        match self.client.profile().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Gmail unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        debug!("Gmail mailbox shutting down");
        Ok(())
    }
}

#[async_trait]
impl MailboxAdapter for GmailMailbox {
    async fn list_new_labeled_messages(&self) -> Result<Vec<RawMessage>, PressdeskError> {
        let label_id = self.label_id().await?;
        let listing = self
            .client
            .list_messages(label_id, self.unread_only, self.max_results)
            .await?;

        let mut parsed = Vec::new();
        for msg_ref in listing.messages {
            let message = match self.client.get_message(&msg_ref.id).await {
                Ok(message) => message,
                Err(e @ PressdeskError::Auth { .. }) => return Err(e),
                Err(e) => {
                    // Stays unread; picked up again next poll.
                    warn!(message_id = %msg_ref.id, error = %e, "failed to fetch message");
                    continue;
                }
            };
            let requests = parse::parse_message(&message, &self.filter);
            if requests.is_empty() {
                info!(message_id = %message.id, "no matching requests in message, marking read");
                if let Err(e) = self.client.mark_read(&message.id).await {
                    warn!(message_id = %message.id, error = %e, "failed to mark message read");
                }
                continue;
            }
            parsed.extend(requests);
        }
        debug!(count = parsed.len(), "listed labeled messages");
        Ok(parsed)
    }

    async fn acknowledge(&self, mailbox_message_id: &str) -> Result<(), PressdeskError> {
        self.client.mark_read(mailbox_message_id).await
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SentEmail, PressdeskError> {
        let from = self.sender().await?;
        let request = compose::compose_reply(from, email)?;
        let sent = self.client.send_raw(&request).await?;
        info!(to = %email.to, outbound_message_id = %sent.id, "reply sent");
        Ok(SentEmail {
            outbound_message_id: sent.id,
            thread_id: sent.thread_id,
        })
    }
}
