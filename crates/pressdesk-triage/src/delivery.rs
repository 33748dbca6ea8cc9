// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery executor: sends approved drafts at most once.
//!
//! Every attempt is bracketed by a delivery marker. The marker is written
//! `in_flight` before the mailbox is called, set to `failed` when the call
//! fails definitely, and confirmed in the same transaction that moves the
//! draft to `sent`. A marker still `in_flight` after a restart means the
//! outcome is unknown, so the draft is quarantined as `send_failed` instead
//! of being sent again.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use pressdesk_core::types::{
    DeliveryState, Draft, DraftId, DraftStatus, NotificationRecord, OutboundEmail, Request,
};
use pressdesk_core::PressdeskError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::context::TriageContext;
use crate::lifecycle;

/// Reason recorded when a draft is quarantined after an interrupted send.
pub const INTERRUPTED_SEND: &str = "interrupted send: outcome unknown, reconcile manually";

/// What happened to one delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { draft: Draft, attempts: u32 },
    /// The draft is now `send_failed`.
    Failed {
        retryable: bool,
        attempts: u32,
        error: String,
    },
    /// Nothing was sent and nothing changed.
    Skipped { reason: String },
}

/// Summary of startup recovery.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Approved drafts moved to `send_failed` because a send was interrupted.
    pub quarantined: Vec<DraftId>,
    /// Approved drafts whose delivery was started again.
    pub resumed: Vec<DraftId>,
}

/// Runs deliveries for approved drafts. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryExecutor {
    ctx: Arc<TriageContext>,
    running: Arc<DashMap<DraftId, ()>>,
}

struct RunningGuard {
    running: Arc<DashMap<DraftId, ()>>,
    draft_id: DraftId,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.remove(&self.draft_id);
    }
}

impl DeliveryExecutor {
    pub fn new(ctx: Arc<TriageContext>) -> Self {
        Self {
            ctx,
            running: Arc::new(DashMap::new()),
        }
    }

    fn claim(&self, draft_id: DraftId) -> Option<RunningGuard> {
        if self.running.insert(draft_id, ()).is_some() {
            return None;
        }
        Some(RunningGuard {
            running: self.running.clone(),
            draft_id,
        })
    }

    /// Deliver in a background task. The draft counts as running from the
    /// moment this returns.
    pub fn spawn(&self, draft_id: DraftId) -> JoinHandle<Result<DeliveryOutcome, PressdeskError>> {
        let guard = self.claim(draft_id);
        let executor = self.clone();
        tokio::spawn(async move {
            let Some(_guard) = guard else {
                return Ok(already_running());
            };
            let outcome = executor.deliver_claimed(draft_id).await;
            if let Err(e) = &outcome {
                error!(draft_id = %draft_id, error = %e, "delivery aborted");
            }
            outcome
        })
    }

    /// Send an approved draft, retrying transient failures.
    ///
    /// Returns `Skipped` when the draft is not `approved` or a delivery for it
    /// is already running in this process.
    pub async fn deliver(&self, draft_id: DraftId) -> Result<DeliveryOutcome, PressdeskError> {
        let Some(_guard) = self.claim(draft_id) else {
            return Ok(already_running());
        };
        self.deliver_claimed(draft_id).await
    }

    async fn deliver_claimed(&self, draft_id: DraftId) -> Result<DeliveryOutcome, PressdeskError> {
        let store = self.ctx.store.as_ref();
        let draft = store
            .get_draft(draft_id)
            .await?
            .ok_or_else(|| PressdeskError::NotFound {
                entity: "draft",
                id: draft_id.to_string(),
            })?;
        if draft.status != DraftStatus::Approved {
            return Ok(DeliveryOutcome::Skipped {
                reason: format!("draft is {}", draft.status),
            });
        }

        if let Some(marker) = store.get_delivery(draft_id).await?
            && marker.state == DeliveryState::InFlight
        {
            self.quarantine(&draft).await?;
            return Ok(DeliveryOutcome::Failed {
                retryable: false,
                attempts: marker.attempts,
                error: INTERRUPTED_SEND.to_string(),
            });
        }

        let request = store
            .get_request(&draft.request_id)
            .await?
            .ok_or_else(|| PressdeskError::NotFound {
                entity: "request",
                id: draft.request_id.to_string(),
            })?;
        let email = outbound_for(&request, &draft);
        let send_timeout = self.ctx.settings.send_timeout;

        let retried = self
            .ctx
            .settings
            .delivery_retry
            .run("send", |attempt| {
                let email = &email;
                let draft = &draft;
                async move {
                    let marker = store.begin_delivery_attempt(draft_id).await?;
                    info!(
                        request_id = %draft.request_id,
                        draft_id = %draft_id,
                        version = draft.version,
                        attempt,
                        marker_attempts = marker.attempts,
                        "sending reply"
                    );
                    let failure = match tokio::time::timeout(
                        send_timeout,
                        self.ctx.mailbox.send(email),
                    )
                    .await
                    {
                        Ok(Ok(sent)) => return Ok((sent, marker.attempts)),
                        Ok(Err(e)) => e,
                        Err(_) => PressdeskError::Timeout {
                            duration: send_timeout,
                        },
                    };
                    store
                        .fail_delivery_attempt(draft_id, &failure.to_string())
                        .await?;
                    Err(failure)
                }
            })
            .await;

        match retried.result {
            Ok((sent, attempts)) => {
                let Some(sent_draft) = lifecycle::mark_sent(store, draft_id, &sent, attempts).await?
                else {
                    // The send happened; the draft left `approved` underneath us.
                    error!(draft_id = %draft_id, "sent draft was no longer approved");
                    return Err(PressdeskError::Internal(format!(
                        "draft {draft_id} sent but could not be marked sent"
                    )));
                };
                self.ctx.forget_draft(draft_id);
                self.tell_reviewers(
                    draft_id,
                    &format!(
                        "Sent v{} to {} ({} attempt(s)).",
                        sent_draft.version,
                        request.reply_address(),
                        attempts
                    ),
                )
                .await;
                Ok(DeliveryOutcome::Sent {
                    draft: sent_draft,
                    attempts,
                })
            }
            Err(e) => {
                let retryable = e.is_retryable();
                let attempts = store
                    .get_delivery(draft_id)
                    .await?
                    .map(|m| m.attempts)
                    .unwrap_or(retried.attempts);
                let reason = e.to_string();
                lifecycle::mark_send_failed(store, draft_id, &reason).await?;
                self.tell_reviewers(
                    draft_id,
                    &format!(
                        "Sending v{} failed after {attempts} attempt(s): {reason}. Approve again to retry.",
                        draft.version
                    ),
                )
                .await;
                Ok(DeliveryOutcome::Failed {
                    retryable,
                    attempts,
                    error: reason,
                })
            }
        }
    }

    /// Reconcile approved drafts after a restart.
    ///
    /// Drafts with an `in_flight` marker are quarantined without sending;
    /// the rest are delivered in the background.
    pub async fn recover(&self) -> Result<RecoveryReport, PressdeskError> {
        let store = self.ctx.store.as_ref();
        let mut report = RecoveryReport::default();
        for draft in store.list_drafts_by_status(DraftStatus::Approved).await? {
            let marker = store.get_delivery(draft.id).await?;
            if marker.is_some_and(|m| m.state == DeliveryState::InFlight) {
                self.quarantine(&draft).await?;
                report.quarantined.push(draft.id);
            } else {
                drop(self.spawn(draft.id));
                report.resumed.push(draft.id);
            }
        }
        if !report.quarantined.is_empty() || !report.resumed.is_empty() {
            info!(
                quarantined = report.quarantined.len(),
                resumed = report.resumed.len(),
                "delivery recovery complete"
            );
        }
        Ok(report)
    }

    /// Number of deliveries currently running.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// Wait up to `timeout` for running deliveries to finish.
    ///
    /// A send cut off by process exit leaves its marker `in_flight` and is
    /// quarantined by [`recover`](Self::recover) on the next start.
    pub async fn drain(&self, timeout: std::time::Duration) {
        if self.running.is_empty() {
            return;
        }
        info!(count = self.running.len(), "waiting for deliveries to finish");
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.running.is_empty() {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    remaining = self.running.len(),
                    "drain timeout reached, abandoning running deliveries"
                );
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        info!("all deliveries finished");
    }

    async fn quarantine(&self, draft: &Draft) -> Result<(), PressdeskError> {
        warn!(
            request_id = %draft.request_id,
            draft_id = %draft.id,
            version = draft.version,
            "send was interrupted; not resending"
        );
        if lifecycle::mark_send_failed(self.ctx.store.as_ref(), draft.id, INTERRUPTED_SEND)
            .await?
            .is_some()
        {
            let text = format!(
                "Draft {} (v{}) may or may not have been sent before a restart. Check the Sent folder, then approve again only if it was not delivered.",
                draft.id, draft.version
            );
            if let Err(e) = self.ctx.review.alert(&text).await {
                warn!(draft_id = %draft.id, error = %e, "could not alert reviewer");
            }
        }
        Ok(())
    }

    async fn tell_reviewers(&self, draft_id: DraftId, text: &str) {
        let conversations = match self.ctx.store.notifications_for_draft(draft_id).await {
            Ok(records) => conversations_of(records),
            Err(e) => {
                warn!(draft_id = %draft_id, error = %e, "could not load review cards");
                BTreeSet::new()
            }
        };
        let result = if conversations.is_empty() {
            self.ctx.review.alert(text).await
        } else {
            let mut result = Ok(());
            for conversation in &conversations {
                if let Err(e) = self.ctx.review.inform(conversation, text).await {
                    result = Err(e);
                }
            }
            result
        };
        if let Err(e) = result {
            warn!(draft_id = %draft_id, error = %e, "could not inform reviewer");
        }
    }
}

/// Each conversation holding a card for the draft, once.
fn conversations_of(records: Vec<NotificationRecord>) -> BTreeSet<String> {
    records.into_iter().map(|r| r.conversation_id).collect()
}

fn already_running() -> DeliveryOutcome {
    DeliveryOutcome::Skipped {
        reason: "delivery already running".to_string(),
    }
}

/// Build the reply for a draft, threaded under the original message.
pub fn outbound_for(request: &Request, draft: &Draft) -> OutboundEmail {
    OutboundEmail {
        to: request.reply_address().to_string(),
        subject: draft.subject.clone(),
        body: draft.body.clone(),
        thread_id: Some(request.thread_id.clone()).filter(|t| !t.is_empty()),
        in_reply_to: request.message_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use pressdesk_core::types::{Provider, RequestId, RequestStatus};

    use super::*;

    fn request(reply_to: &str, thread: &str) -> Request {
        Request {
            id: RequestId("m1".into()),
            mailbox_message_id: "m1".into(),
            sender_name: "Jo".into(),
            sender_email: "jo@outlet.example".into(),
            reply_to: reply_to.to_string(),
            subject: "Need fintech founders".into(),
            deadline: None,
            requirements: None,
            body_text: "query".into(),
            thread_id: thread.into(),
            message_id: Some("<abc@mail>".into()),
            received_at: "2026-01-01T00:00:00.000Z".into(),
            provider: Provider::Generic,
            requester_name: None,
            summary: None,
            category: None,
            media_outlet: None,
            status: RequestStatus::Drafted,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    fn draft() -> Draft {
        Draft {
            id: DraftId(7),
            request_id: RequestId("m1".into()),
            version: 2,
            subject: "Re: Need fintech founders".into(),
            body: "Hi Jo".into(),
            status: DraftStatus::Approved,
            outbound_message_id: None,
            outbound_thread_id: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn each_conversation_is_told_once() {
        let card = |conversation: &str, msg: u32| NotificationRecord {
            id: pressdesk_core::NotificationId(format!("{conversation}:{msg}")),
            draft_id: DraftId(7),
            conversation_id: conversation.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let conversations =
            conversations_of(vec![card("chat-a", 1), card("chat-b", 2), card("chat-a", 3)]);
        assert_eq!(
            conversations.into_iter().collect::<Vec<_>>(),
            vec!["chat-a".to_string(), "chat-b".to_string()]
        );
    }

    #[test]
    fn outbound_prefers_reply_to_and_threads() {
        let email = outbound_for(&request("query-1@haro.example", "t-1"), &draft());
        assert_eq!(email.to, "query-1@haro.example");
        assert_eq!(email.thread_id.as_deref(), Some("t-1"));
        assert_eq!(email.in_reply_to.as_deref(), Some("<abc@mail>"));
        assert_eq!(email.body, "Hi Jo");
    }

    #[test]
    fn outbound_without_thread_starts_new_one() {
        let email = outbound_for(&request("", ""), &draft());
        assert_eq!(email.to, "jo@outlet.example");
        assert!(email.thread_id.is_none());
    }
}
