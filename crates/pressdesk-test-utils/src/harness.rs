// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end triage tests.
//!
//! `TestHarness` assembles the triage pipeline over a temp SQLite database
//! and mock collaborators. `restart()` reopens the same database with a fresh
//! context, which is how tests simulate a process crash.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pressdesk_core::types::{DraftId, InboundAction, NotificationId};
use pressdesk_core::{PressdeskError, RecordStore};
use pressdesk_storage::SqliteStorage;
use pressdesk_triage::{
    DeliveryExecutor, DeliveryOutcome, HandleOutcome, RetryPolicy, ReviewCoordinator, TickReport,
    TriageContext, TriageSettings,
};

use crate::mock_generator::{MockGenerator, MockRelevanceJudge};
use crate::mock_mailbox::MockMailbox;
use crate::mock_review::MockReviewChannel;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    settings: TriageSettings,
    relevance: Option<Arc<MockRelevanceJudge>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: TriageSettings {
                generation_retry: RetryPolicy::immediate(3),
                delivery_retry: RetryPolicy::immediate(3),
                generation_timeout: Duration::from_secs(5),
                send_timeout: Duration::from_secs(5),
                edit_timeout: Duration::from_secs(1_800),
            },
            relevance: None,
        }
    }

    pub fn with_generation_attempts(mut self, attempts: u32) -> Self {
        self.settings.generation_retry = RetryPolicy::immediate(attempts);
        self
    }

    pub fn with_delivery_attempts(mut self, attempts: u32) -> Self {
        self.settings.delivery_retry = RetryPolicy::immediate(attempts);
        self
    }

    pub fn with_edit_timeout(mut self, timeout: Duration) -> Self {
        self.settings.edit_timeout = timeout;
        self
    }

    /// Judge HARO items with `judge` before ingestion.
    pub fn with_relevance(mut self, judge: MockRelevanceJudge) -> Self {
        self.relevance = Some(Arc::new(judge));
        self
    }

    pub async fn build(self) -> Result<TestHarness, PressdeskError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| PressdeskError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("pressdesk-test.db");

        let mailbox = Arc::new(MockMailbox::new());
        let generator = Arc::new(MockGenerator::new());
        let review = Arc::new(MockReviewChannel::new());

        let (ctx, delivery, coordinator) = assemble(
            &db_path,
            &mailbox,
            &generator,
            &review,
            self.relevance.as_ref(),
            &self.settings,
        )
        .await?;

        Ok(TestHarness {
            mailbox,
            generator,
            review,
            relevance: self.relevance,
            ctx,
            delivery,
            coordinator,
            settings: self.settings,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

async fn assemble(
    db_path: &std::path::Path,
    mailbox: &Arc<MockMailbox>,
    generator: &Arc<MockGenerator>,
    review: &Arc<MockReviewChannel>,
    relevance: Option<&Arc<MockRelevanceJudge>>,
    settings: &TriageSettings,
) -> Result<(Arc<TriageContext>, DeliveryExecutor, ReviewCoordinator), PressdeskError> {
    let storage = SqliteStorage::open(&db_path.to_string_lossy()).await?;
    let mut ctx = TriageContext::new(
        Arc::new(storage),
        mailbox.clone(),
        generator.clone(),
        review.clone(),
        settings.clone(),
    );
    if let Some(judge) = relevance {
        ctx = ctx.with_relevance(judge.clone());
    }
    let ctx = Arc::new(ctx);
    let delivery = DeliveryExecutor::new(ctx.clone());
    let coordinator = ReviewCoordinator::new(ctx.clone(), delivery.clone());
    Ok((ctx, delivery, coordinator))
}

/// A triage pipeline over mock collaborators and a temp database.
pub struct TestHarness {
    pub mailbox: Arc<MockMailbox>,
    pub generator: Arc<MockGenerator>,
    pub review: Arc<MockReviewChannel>,
    pub relevance: Option<Arc<MockRelevanceJudge>>,
    pub ctx: Arc<TriageContext>,
    pub delivery: DeliveryExecutor,
    pub coordinator: ReviewCoordinator,
    settings: TriageSettings,
    db_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.ctx.store.as_ref()
    }

    /// Run one poll tick.
    pub async fn tick(&self) -> Result<TickReport, PressdeskError> {
        pressdesk_triage::poller::tick(&self.ctx).await
    }

    /// Handle one reviewer action without waiting for any delivery it starts.
    pub async fn handle(&self, action: InboundAction) -> Result<HandleOutcome, PressdeskError> {
        self.coordinator.handle(action).await
    }

    /// Handle one reviewer action and wait for the delivery it starts, if any.
    pub async fn handle_and_settle(
        &self,
        action: InboundAction,
    ) -> Result<Option<DeliveryOutcome>, PressdeskError> {
        match self.coordinator.handle(action).await? {
            HandleOutcome::Dispatched { delivery, .. } => delivery
                .await
                .map_err(|e| PressdeskError::Internal(e.to_string()))?
                .map(Some),
            _ => Ok(None),
        }
    }

    /// Id of the latest review card posted for `draft_id`.
    pub async fn card(&self, draft_id: DraftId) -> Option<NotificationId> {
        self.review.card_for(draft_id).await.map(|c| c.card.id)
    }

    /// Reopen the database with a fresh context, keeping the mocks.
    ///
    /// Nothing from the old context survives except what was persisted.
    pub async fn restart(&mut self) -> Result<(), PressdeskError> {
        self.ctx.store.close().await?;
        let (ctx, delivery, coordinator) = assemble(
            &self.db_path,
            &self.mailbox,
            &self.generator,
            &self.review,
            self.relevance.as_ref(),
            &self.settings,
        )
        .await?;
        self.ctx = ctx;
        self.delivery = delivery;
        self.coordinator = coordinator;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::raw_message;
    use pressdesk_core::types::DraftStatus;

    #[tokio::test]
    async fn harness_builds_with_empty_store() {
        let harness = TestHarness::builder().build().await.unwrap();
        let counts = harness.store().status_counts().await.unwrap();
        assert!(counts.requests.iter().all(|(_, n)| *n == 0));
    }

    #[tokio::test]
    async fn restart_keeps_persisted_state() {
        let mut harness = TestHarness::builder().build().await.unwrap();
        harness.mailbox.push_message(raw_message("m1")).await;
        harness.tick().await.unwrap();

        harness.restart().await.unwrap();
        let pending = harness
            .store()
            .list_drafts_by_status(DraftStatus::PendingReview)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }
}
