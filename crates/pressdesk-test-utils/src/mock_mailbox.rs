// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock mailbox for deterministic testing.
//!
//! `MockMailbox` lists injected messages until they are acknowledged, replays
//! scripted send results, and captures every send call for assertions.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pressdesk_core::types::{AdapterType, HealthStatus, OutboundEmail, RawMessage, SentEmail};
use pressdesk_core::{MailboxAdapter, PluginAdapter, PressdeskError};

/// A scripted mailbox.
///
/// - **inbox**: messages added with `push_message()` are listed until acknowledged
/// - **send script**: results queued with `queue_send_failure()` are returned in
///   order; once empty, every send succeeds with generated ids
/// - **captures**: every send call and every acknowledgement is recorded
#[derive(Default)]
pub struct MockMailbox {
    inbox: Mutex<Vec<RawMessage>>,
    acknowledged: Mutex<Vec<String>>,
    list_failures: Mutex<VecDeque<PressdeskError>>,
    send_script: Mutex<VecDeque<PressdeskError>>,
    send_calls: Mutex<Vec<OutboundEmail>>,
    sent: Mutex<Vec<(OutboundEmail, SentEmail)>>,
}

impl MockMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the inbox. The same message may be pushed repeatedly
    /// to simulate the mailbox listing it again.
    pub async fn push_message(&self, msg: RawMessage) {
        self.inbox.lock().await.push(msg);
    }

    /// Make the next listing fail with `err`.
    pub async fn fail_next_list(&self, err: PressdeskError) {
        self.list_failures.lock().await.push_back(err);
    }

    /// Make the next send call fail with `err`.
    pub async fn queue_send_failure(&self, err: PressdeskError) {
        self.send_script.lock().await.push_back(err);
    }

    /// Mark a mailbox message unread again so it is listed on the next poll.
    pub async fn unacknowledge(&self, mailbox_message_id: &str) {
        self.acknowledged
            .lock()
            .await
            .retain(|id| id != mailbox_message_id);
    }

    /// Mailbox ids passed to `acknowledge()`, in call order.
    pub async fn acknowledged(&self) -> Vec<String> {
        self.acknowledged.lock().await.clone()
    }

    /// Every email passed to `send()`, including failed attempts.
    pub async fn send_calls(&self) -> Vec<OutboundEmail> {
        self.send_calls.lock().await.clone()
    }

    /// Emails the mailbox accepted, with the ids it assigned.
    pub async fn sent_emails(&self) -> Vec<(OutboundEmail, SentEmail)> {
        self.sent.lock().await.clone()
    }

    /// Number of emails the mailbox accepted.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for MockMailbox {
    fn name(&self) -> &str {
        "mock-mailbox"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailbox
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        Ok(())
    }
}

#[async_trait]
impl MailboxAdapter for MockMailbox {
    async fn list_new_labeled_messages(&self) -> Result<Vec<RawMessage>, PressdeskError> {
        if let Some(err) = self.list_failures.lock().await.pop_front() {
            return Err(err);
        }
        let acknowledged: HashSet<String> =
            self.acknowledged.lock().await.iter().cloned().collect();
        Ok(self
            .inbox
            .lock()
            .await
            .iter()
            .filter(|m| !acknowledged.contains(&m.mailbox_message_id))
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, mailbox_message_id: &str) -> Result<(), PressdeskError> {
        self.acknowledged
            .lock()
            .await
            .push(mailbox_message_id.to_string());
        Ok(())
    }

    async fn send(&self, email: &OutboundEmail) -> Result<SentEmail, PressdeskError> {
        self.send_calls.lock().await.push(email.clone());
        if let Some(err) = self.send_script.lock().await.pop_front() {
            return Err(err);
        }
        let sent = SentEmail {
            outbound_message_id: format!("mock-out-{}", uuid::Uuid::new_v4()),
            thread_id: email
                .thread_id
                .clone()
                .unwrap_or_else(|| format!("mock-thread-{}", uuid::Uuid::new_v4())),
        };
        self.sent.lock().await.push((email.clone(), sent.clone()));
        Ok(sent)
    }
}
