// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the RecordStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use pressdesk_config::model::StorageConfig;
use pressdesk_core::types::{
    ActionLogEntry, ActionLogRecord, DeliveryMarker, Draft, DraftId, DraftStatus,
    NotificationId, NotificationRecord, PendingEdit, RawMessage, Request, RequestId,
    RequestStatus, SentEmail, StatusCounts,
};
use pressdesk_core::{AdapterType, HealthStatus, PluginAdapter, PressdeskError, RecordStore};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed record store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`RecordStore::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`RecordStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the store at `path` and initialize it in one step.
    pub async fn open(path: &str) -> Result<Self, PressdeskError> {
        let storage = Self::new(StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        Ok(storage)
    }

    fn db(&self) -> Result<&Database, PressdeskError> {
        self.db.get().ok_or_else(|| PressdeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStorage {
    async fn initialize(&self) -> Result<(), PressdeskError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| PressdeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), PressdeskError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- requests ---

    async fn insert_request_if_absent(
        &self,
        raw: &RawMessage,
    ) -> Result<Option<Request>, PressdeskError> {
        queries::requests::insert_request_if_absent(self.db()?, raw).await
    }

    async fn get_request(&self, id: &RequestId) -> Result<Option<Request>, PressdeskError> {
        queries::requests::get_request(self.db()?, id).await
    }

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<Request>, PressdeskError> {
        queries::requests::list_requests_by_status(self.db()?, status).await
    }

    async fn update_request_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<(), PressdeskError> {
        queries::requests::update_request_status(self.db()?, id, status).await
    }

    // --- drafts ---

    async fn insert_draft(
        &self,
        request_id: &RequestId,
        subject: &str,
        body: &str,
    ) -> Result<Draft, PressdeskError> {
        queries::drafts::insert_draft(self.db()?, request_id, subject, body).await
    }

    async fn get_draft(&self, id: DraftId) -> Result<Option<Draft>, PressdeskError> {
        queries::drafts::get_draft(self.db()?, id).await
    }

    async fn active_draft(&self, request_id: &RequestId) -> Result<Option<Draft>, PressdeskError> {
        queries::drafts::active_draft(self.db()?, request_id).await
    }

    async fn list_drafts(&self, request_id: &RequestId) -> Result<Vec<Draft>, PressdeskError> {
        queries::drafts::list_drafts(self.db()?, request_id).await
    }

    async fn list_drafts_by_status(
        &self,
        status: DraftStatus,
    ) -> Result<Vec<Draft>, PressdeskError> {
        queries::drafts::list_drafts_by_status(self.db()?, status).await
    }

    async fn transition_draft(
        &self,
        id: DraftId,
        from: &[DraftStatus],
        to: DraftStatus,
    ) -> Result<Option<Draft>, PressdeskError> {
        queries::drafts::transition_draft(self.db()?, id, from, to).await
    }

    async fn supersede_draft(
        &self,
        id: DraftId,
        subject: &str,
        body: &str,
    ) -> Result<Option<Draft>, PressdeskError> {
        queries::drafts::supersede_draft(self.db()?, id, subject, body).await
    }

    async fn mark_draft_sent(
        &self,
        id: DraftId,
        sent: &SentEmail,
    ) -> Result<Option<Draft>, PressdeskError> {
        queries::drafts::mark_draft_sent(self.db()?, id, sent).await
    }

    async fn count_active_drafts(&self, request_id: &RequestId) -> Result<u64, PressdeskError> {
        queries::drafts::count_active_drafts(self.db()?, request_id).await
    }

    // --- notifications ---

    async fn insert_notification(&self, record: &NotificationRecord) -> Result<(), PressdeskError> {
        queries::notifications::insert_notification(self.db()?, record).await
    }

    async fn get_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<NotificationRecord>, PressdeskError> {
        queries::notifications::get_notification(self.db()?, id).await
    }

    async fn notifications_for_draft(
        &self,
        draft_id: DraftId,
    ) -> Result<Vec<NotificationRecord>, PressdeskError> {
        queries::notifications::notifications_for_draft(self.db()?, draft_id).await
    }

    // --- pending edits ---

    async fn upsert_pending_edit(&self, edit: &PendingEdit) -> Result<(), PressdeskError> {
        queries::pending_edits::upsert_pending_edit(self.db()?, edit).await
    }

    async fn get_pending_edit(
        &self,
        conversation_id: &str,
    ) -> Result<Option<PendingEdit>, PressdeskError> {
        queries::pending_edits::get_pending_edit(self.db()?, conversation_id).await
    }

    async fn delete_pending_edit(&self, conversation_id: &str) -> Result<(), PressdeskError> {
        queries::pending_edits::delete_pending_edit(self.db()?, conversation_id).await
    }

    async fn close_pending_edits_for_draft(
        &self,
        draft_id: DraftId,
    ) -> Result<(), PressdeskError> {
        queries::pending_edits::close_pending_edits_for_draft(self.db()?, draft_id).await
    }

    // --- delivery markers ---

    async fn get_delivery(
        &self,
        draft_id: DraftId,
    ) -> Result<Option<DeliveryMarker>, PressdeskError> {
        queries::deliveries::get_delivery(self.db()?, draft_id).await
    }

    async fn begin_delivery_attempt(
        &self,
        draft_id: DraftId,
    ) -> Result<DeliveryMarker, PressdeskError> {
        queries::deliveries::begin_delivery_attempt(self.db()?, draft_id).await
    }

    async fn fail_delivery_attempt(
        &self,
        draft_id: DraftId,
        error: &str,
    ) -> Result<(), PressdeskError> {
        queries::deliveries::fail_delivery_attempt(self.db()?, draft_id, error).await
    }

    async fn clear_delivery(&self, draft_id: DraftId) -> Result<(), PressdeskError> {
        queries::deliveries::clear_delivery(self.db()?, draft_id).await
    }

    // --- action log ---

    async fn append_action(&self, entry: &ActionLogEntry) -> Result<(), PressdeskError> {
        queries::action_log::append_action(self.db()?, entry).await
    }

    async fn list_actions(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ActionLogRecord>, PressdeskError> {
        queries::action_log::list_actions(self.db()?, request_id).await
    }

    // --- reporting ---

    async fn status_counts(&self) -> Result<StatusCounts, PressdeskError> {
        queries::stats::status_counts(self.db()?).await
    }
}
