// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide handles shared by the poll tick, the review loop and delivery.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pressdesk_config::PressdeskConfig;
use pressdesk_core::types::DraftId;
use pressdesk_core::{DraftGenerator, MailboxAdapter, RecordStore, RelevanceJudge, ReviewChannel};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::retry::RetryPolicy;

/// Tunables for the triage pipeline.
#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub generation_retry: RetryPolicy,
    pub delivery_retry: RetryPolicy,
    /// Upper bound on one draft generation call.
    pub generation_timeout: Duration,
    /// Upper bound on one send call.
    pub send_timeout: Duration,
    /// How long a reviewer has to submit edited text.
    pub edit_timeout: Duration,
}

impl TriageSettings {
    pub fn from_config(config: &PressdeskConfig) -> Self {
        Self {
            generation_retry: RetryPolicy::from_section(&config.retry.generation),
            delivery_retry: RetryPolicy::from_section(&config.retry.delivery),
            generation_timeout: Duration::from_secs(config.gemini.timeout_secs),
            send_timeout: Duration::from_secs(config.delivery.send_timeout_secs),
            edit_timeout: Duration::from_secs(config.review.edit_timeout_secs),
        }
    }
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self::from_config(&PressdeskConfig::default())
    }
}

/// Store handle, collaborator handles and settings. Built once at startup and
/// shared behind an `Arc`; components hold identifiers only and re-read
/// state from the store.
pub struct TriageContext {
    pub store: Arc<dyn RecordStore>,
    pub mailbox: Arc<dyn MailboxAdapter>,
    pub generator: Arc<dyn DraftGenerator>,
    pub review: Arc<dyn ReviewChannel>,
    pub relevance: Option<Arc<dyn RelevanceJudge>>,
    pub settings: TriageSettings,
    draft_locks: DashMap<DraftId, Arc<Mutex<()>>>,
}

impl TriageContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        mailbox: Arc<dyn MailboxAdapter>,
        generator: Arc<dyn DraftGenerator>,
        review: Arc<dyn ReviewChannel>,
        settings: TriageSettings,
    ) -> Self {
        Self {
            store,
            mailbox,
            generator,
            review,
            relevance: None,
            settings,
            draft_locks: DashMap::new(),
        }
    }

    /// Attach a relevance judge for digest items.
    pub fn with_relevance(mut self, judge: Arc<dyn RelevanceJudge>) -> Self {
        self.relevance = Some(judge);
        self
    }

    /// Serialize transitions on one draft version. Held across the
    /// read-check-write of a reviewer action.
    pub async fn lock_draft(&self, id: DraftId) -> OwnedMutexGuard<()> {
        let lock = self.draft_locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a draft that reached a terminal status.
    pub fn forget_draft(&self, id: DraftId) {
        self.draft_locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
