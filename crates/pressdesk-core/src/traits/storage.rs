// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store trait: the single owner of every persisted entity.

use async_trait::async_trait;

use crate::error::PressdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ActionLogEntry, ActionLogRecord, DeliveryMarker, Draft, DraftId, DraftStatus,
    NotificationId, NotificationRecord, PendingEdit, RawMessage, Request, RequestId,
    RequestStatus, SentEmail, StatusCounts,
};

/// Durable storage for requests, drafts, review bookkeeping and delivery markers.
///
/// Every draft status change goes through a compare-and-set on the stored
/// status: methods that transition a draft return `Ok(None)` when the draft
/// was no longer in one of the expected statuses.
#[async_trait]
pub trait RecordStore: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), PressdeskError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), PressdeskError>;

    // --- requests ---

    /// Inserts a request with status `new` unless one with the same source id
    /// exists. Returns `None` when it already existed.
    async fn insert_request_if_absent(
        &self,
        raw: &RawMessage,
    ) -> Result<Option<Request>, PressdeskError>;

    async fn get_request(&self, id: &RequestId) -> Result<Option<Request>, PressdeskError>;

    async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<Request>, PressdeskError>;

    async fn update_request_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<(), PressdeskError>;

    // --- drafts ---

    /// Creates the next version for a request in `pending_review` and moves
    /// the request to `drafted`. Fails with
    /// [`PressdeskError::ActiveDraftExists`] when an active draft exists.
    async fn insert_draft(
        &self,
        request_id: &RequestId,
        subject: &str,
        body: &str,
    ) -> Result<Draft, PressdeskError>;

    async fn get_draft(&self, id: DraftId) -> Result<Option<Draft>, PressdeskError>;

    /// The request's draft in `pending_review`, `approved` or `send_failed`.
    async fn active_draft(&self, request_id: &RequestId) -> Result<Option<Draft>, PressdeskError>;

    /// All versions for a request, oldest first.
    async fn list_drafts(&self, request_id: &RequestId) -> Result<Vec<Draft>, PressdeskError>;

    async fn list_drafts_by_status(
        &self,
        status: DraftStatus,
    ) -> Result<Vec<Draft>, PressdeskError>;

    /// Moves a draft to `to` if its current status is one of `from`.
    async fn transition_draft(
        &self,
        id: DraftId,
        from: &[DraftStatus],
        to: DraftStatus,
    ) -> Result<Option<Draft>, PressdeskError>;

    /// Atomically moves a `pending_review` draft to `edited_pending_resend`,
    /// drops its pending edits and inserts the next version. Returns the new
    /// version.
    async fn supersede_draft(
        &self,
        id: DraftId,
        subject: &str,
        body: &str,
    ) -> Result<Option<Draft>, PressdeskError>;

    /// Atomically moves an `approved` draft to `sent`, records the outbound
    /// ids, confirms the delivery marker and closes the request.
    async fn mark_draft_sent(
        &self,
        id: DraftId,
        sent: &SentEmail,
    ) -> Result<Option<Draft>, PressdeskError>;

    async fn count_active_drafts(&self, request_id: &RequestId) -> Result<u64, PressdeskError>;

    // --- notifications ---

    async fn insert_notification(&self, record: &NotificationRecord) -> Result<(), PressdeskError>;

    async fn get_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<NotificationRecord>, PressdeskError>;

    async fn notifications_for_draft(
        &self,
        draft_id: DraftId,
    ) -> Result<Vec<NotificationRecord>, PressdeskError>;

    // --- pending edits ---

    /// Opens (or replaces) the pending edit for a conversation.
    async fn upsert_pending_edit(&self, edit: &PendingEdit) -> Result<(), PressdeskError>;

    async fn get_pending_edit(
        &self,
        conversation_id: &str,
    ) -> Result<Option<PendingEdit>, PressdeskError>;

    async fn delete_pending_edit(&self, conversation_id: &str) -> Result<(), PressdeskError>;

    /// Closes the draft's open edits, keeping them so late text resolves
    /// to the draft.
    async fn close_pending_edits_for_draft(&self, draft_id: DraftId)
    -> Result<(), PressdeskError>;

    // --- delivery markers ---

    async fn get_delivery(&self, draft_id: DraftId)
    -> Result<Option<DeliveryMarker>, PressdeskError>;

    /// Writes an `in_flight` marker and bumps the attempt count.
    async fn begin_delivery_attempt(
        &self,
        draft_id: DraftId,
    ) -> Result<DeliveryMarker, PressdeskError>;

    /// Marks the current attempt `failed` with the given error text.
    async fn fail_delivery_attempt(
        &self,
        draft_id: DraftId,
        error: &str,
    ) -> Result<(), PressdeskError>;

    /// Removes the marker so a re-approved draft starts a fresh attempt count.
    async fn clear_delivery(&self, draft_id: DraftId) -> Result<(), PressdeskError>;

    // --- action log ---

    async fn append_action(&self, entry: &ActionLogEntry) -> Result<(), PressdeskError>;

    async fn list_actions(
        &self,
        request_id: &RequestId,
    ) -> Result<Vec<ActionLogRecord>, PressdeskError>;

    // --- reporting ---

    async fn status_counts(&self) -> Result<StatusCounts, PressdeskError>;
}
