// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock review channel for deterministic testing.
//!
//! `MockReviewChannel` implements `ReviewChannel` with injectable reviewer
//! actions and captured cards, replies and alerts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use pressdesk_core::types::{
    AdapterType, Draft, DraftId, HealthStatus, InboundAction, NotificationId, NotificationRef,
    Request, RequestId,
};
use pressdesk_core::{PluginAdapter, PressdeskError, ReviewChannel};

/// Conversation all mock cards are posted to.
pub const REVIEW_CONVERSATION: &str = "review-chat";

/// A review card captured by [`MockReviewChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedCard {
    pub request_id: RequestId,
    pub draft_id: DraftId,
    pub version: u32,
    pub subject: String,
    pub body: String,
    pub card: NotificationRef,
}

/// A mock review channel.
///
/// - **inbound**: actions injected via `inject_action()` are returned by `receive()`
/// - **cards**: drafts passed to `notify()` are captured with the id they were given
/// - **informed** / **alerts**: plain text replies are captured per conversation
pub struct MockReviewChannel {
    inbound: Arc<Mutex<VecDeque<InboundAction>>>,
    notify: Arc<Notify>,
    cards: Mutex<Vec<PostedCard>>,
    informed: Mutex<Vec<(String, String)>>,
    alerts: Mutex<Vec<String>>,
    next_message: AtomicU64,
    fail_notify: AtomicBool,
}

impl MockReviewChannel {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            cards: Mutex::new(Vec::new()),
            informed: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            next_message: AtomicU64::new(1),
            fail_notify: AtomicBool::new(false),
        }
    }

    /// Inject a reviewer action. The next call to `receive()` returns it.
    pub async fn inject_action(&self, action: InboundAction) {
        self.inbound.lock().await.push_back(action);
        self.notify.notify_one();
    }

    /// Make `notify()` fail until switched back.
    pub fn set_notify_failing(&self, failing: bool) {
        self.fail_notify.store(failing, Ordering::SeqCst);
    }

    pub async fn cards(&self) -> Vec<PostedCard> {
        self.cards.lock().await.clone()
    }

    /// The most recent card posted for `draft_id`.
    pub async fn card_for(&self, draft_id: DraftId) -> Option<PostedCard> {
        self.cards
            .lock()
            .await
            .iter()
            .rev()
            .find(|c| c.draft_id == draft_id)
            .cloned()
    }

    /// `(conversation_id, text)` pairs passed to `inform()`.
    pub async fn informed(&self) -> Vec<(String, String)> {
        self.informed.lock().await.clone()
    }

    pub async fn alerts(&self) -> Vec<String> {
        self.alerts.lock().await.clone()
    }
}

impl Default for MockReviewChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockReviewChannel {
    fn name(&self) -> &str {
        "mock-review"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ReviewChannel
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        Ok(())
    }
}

#[async_trait]
impl ReviewChannel for MockReviewChannel {
    async fn connect(&mut self) -> Result<(), PressdeskError> {
        Ok(())
    }

    async fn notify(
        &self,
        request: &Request,
        draft: &Draft,
    ) -> Result<NotificationRef, PressdeskError> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(PressdeskError::channel("mock review channel is down"));
        }
        let n = self.next_message.fetch_add(1, Ordering::SeqCst);
        let card = NotificationRef {
            id: NotificationId(format!("{REVIEW_CONVERSATION}:{n}")),
            conversation_id: REVIEW_CONVERSATION.to_string(),
        };
        self.cards.lock().await.push(PostedCard {
            request_id: request.id.clone(),
            draft_id: draft.id,
            version: draft.version,
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            card: card.clone(),
        });
        Ok(card)
    }

    async fn inform(&self, conversation_id: &str, text: &str) -> Result<(), PressdeskError> {
        self.informed
            .lock()
            .await
            .push((conversation_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn alert(&self, text: &str) -> Result<(), PressdeskError> {
        self.alerts.lock().await.push(text.to_string());
        Ok(())
    }

    async fn receive(&self) -> Result<InboundAction, PressdeskError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(action) = queue.pop_front() {
                    return Ok(action);
                }
            }
            self.notify.notified().await;
        }
    }
}
