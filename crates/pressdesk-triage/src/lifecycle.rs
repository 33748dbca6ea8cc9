// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft lifecycle: creation and every status transition.
//!
//! ```text
//! pending_review --approve-->      approved
//! pending_review --reject-->       rejected                (terminal)
//! pending_review --edit_request--> pending_review          (same version)
//! pending_review --supersede-->    edited_pending_resend   (terminal; v+1 pending_review)
//! approved       --delivered-->    sent                    (terminal; request closed)
//! approved       --send failed-->  send_failed
//! send_failed    --approve-->      approved
//! ```
//!
//! Each transition is a compare-and-set in the store and is recorded in the
//! action log. The one-active-draft rule is re-checked afterwards.

use pressdesk_core::types::{ActionLogEntry, Draft, DraftId, DraftStatus, RequestId, SentEmail};
use pressdesk_core::{PressdeskError, RecordStore};
use tracing::{error, info, warn};

/// A reviewer decision on a specific draft version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewerAction {
    Approve,
    Reject,
    /// Reviewer asked to edit; the version stays `pending_review`.
    EditRequest,
    /// Replace the version with edited text.
    Supersede { subject: String, body: String },
}

impl ReviewerAction {
    fn name(&self) -> &'static str {
        match self {
            ReviewerAction::Approve => "approve",
            ReviewerAction::Reject => "reject",
            ReviewerAction::EditRequest => "edit_request",
            ReviewerAction::Supersede { .. } => "edit_submit",
        }
    }

    /// Statuses from which this action is legal.
    fn accepted_from(&self) -> &'static [DraftStatus] {
        match self {
            ReviewerAction::Approve => &[DraftStatus::PendingReview, DraftStatus::SendFailed],
            _ => &[DraftStatus::PendingReview],
        }
    }
}

/// The draft an action acted on and, for a supersede, the version it created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The acted-on version after the transition.
    pub draft: Draft,
    /// Its status before the transition.
    pub previous: DraftStatus,
    /// The new version created by a supersede.
    pub successor: Option<Draft>,
}

/// Create the next draft version for a request. Fails with
/// `ActiveDraftExists` if the request already has an active draft.
pub async fn create_draft(
    store: &dyn RecordStore,
    request_id: &RequestId,
    subject: &str,
    body: &str,
) -> Result<Draft, PressdeskError> {
    let draft = store.insert_draft(request_id, subject, body).await?;
    store
        .append_action(
            &ActionLogEntry::new(request_id.clone(), "generator", "draft_created")
                .draft(draft.id)
                .created(DraftStatus::PendingReview)
                .details(format!("version={}", draft.version)),
        )
        .await?;
    info!(request_id = %request_id, draft_id = %draft.id, version = draft.version, "draft created");
    verify_single_active(store, request_id).await?;
    Ok(draft)
}

fn stale(draft: &Draft) -> PressdeskError {
    PressdeskError::StaleAction {
        draft_id: draft.id,
        status: draft.status,
    }
}

/// Apply a reviewer action to draft `draft_id` at `version`.
///
/// Fails with `StaleAction` when the version is not the one stored under that
/// id, or when its status does not allow the action (including when a racing
/// action got there first).
pub async fn record_reviewer_action(
    store: &dyn RecordStore,
    draft_id: DraftId,
    version: u32,
    action: &ReviewerAction,
    actor: &str,
) -> Result<Transition, PressdeskError> {
    let current = store
        .get_draft(draft_id)
        .await?
        .ok_or_else(|| PressdeskError::NotFound {
            entity: "draft",
            id: draft_id.to_string(),
        })?;

    if current.version != version || !action.accepted_from().contains(&current.status) {
        warn!(
            draft_id = %draft_id,
            version,
            status = %current.status,
            action = action.name(),
            "stale reviewer action"
        );
        return Err(stale(&current));
    }

    let previous = current.status;
    let (draft, successor) = match action {
        ReviewerAction::EditRequest => (current, None),
        ReviewerAction::Approve => {
            let approved = store
                .transition_draft(draft_id, action.accepted_from(), DraftStatus::Approved)
                .await?;
            let Some(approved) = approved else {
                return Err(reload_stale(store, draft_id).await);
            };
            if previous == DraftStatus::SendFailed {
                // Manual re-approval starts a fresh send protocol.
                store.clear_delivery(draft_id).await?;
            }
            store.close_pending_edits_for_draft(draft_id).await?;
            (approved, None)
        }
        ReviewerAction::Reject => {
            let rejected = store
                .transition_draft(draft_id, action.accepted_from(), DraftStatus::Rejected)
                .await?;
            let Some(rejected) = rejected else {
                return Err(reload_stale(store, draft_id).await);
            };
            store.close_pending_edits_for_draft(draft_id).await?;
            (rejected, None)
        }
        ReviewerAction::Supersede { subject, body } => {
            let Some(next) = store.supersede_draft(draft_id, subject, body).await? else {
                return Err(reload_stale(store, draft_id).await);
            };
            let retired = store
                .get_draft(draft_id)
                .await?
                .ok_or_else(|| PressdeskError::Internal(format!("draft {draft_id} vanished")))?;
            (retired, Some(next))
        }
    };

    let mut entry = ActionLogEntry::new(draft.request_id.clone(), actor, action.name())
        .draft(draft.id)
        .transition(previous, draft.status)
        .details(format!("version={}", draft.version));
    if let Some(next) = &successor {
        entry = entry.details(format!(
            "version={} superseded_by={} (v{})",
            draft.version, next.id, next.version
        ));
    }
    store.append_action(&entry).await?;

    info!(
        request_id = %draft.request_id,
        draft_id = %draft.id,
        version = draft.version,
        from = %previous,
        to = %draft.status,
        actor,
        "reviewer action applied"
    );
    verify_single_active(store, &draft.request_id).await?;
    Ok(Transition {
        draft,
        previous,
        successor,
    })
}

async fn reload_stale(store: &dyn RecordStore, draft_id: DraftId) -> PressdeskError {
    match store.get_draft(draft_id).await {
        Ok(Some(draft)) => stale(&draft),
        Ok(None) => PressdeskError::NotFound {
            entity: "draft",
            id: draft_id.to_string(),
        },
        Err(e) => e,
    }
}

/// Record a confirmed send. `None` if the draft was not `approved`.
pub async fn mark_sent(
    store: &dyn RecordStore,
    draft_id: DraftId,
    sent: &SentEmail,
    attempts: u32,
) -> Result<Option<Draft>, PressdeskError> {
    let Some(draft) = store.mark_draft_sent(draft_id, sent).await? else {
        return Ok(None);
    };
    store
        .append_action(
            &ActionLogEntry::new(draft.request_id.clone(), "delivery", "sent")
                .draft(draft.id)
                .transition(DraftStatus::Approved, DraftStatus::Sent)
                .details(format!(
                    "outbound_message_id={} thread_id={} attempts={attempts}",
                    sent.outbound_message_id, sent.thread_id
                )),
        )
        .await?;
    info!(
        request_id = %draft.request_id,
        draft_id = %draft.id,
        outbound_message_id = %sent.outbound_message_id,
        attempts,
        "draft sent"
    );
    Ok(Some(draft))
}

/// Move an `approved` draft to `send_failed`. `None` if it was not `approved`.
pub async fn mark_send_failed(
    store: &dyn RecordStore,
    draft_id: DraftId,
    reason: &str,
) -> Result<Option<Draft>, PressdeskError> {
    let Some(draft) = store
        .transition_draft(draft_id, &[DraftStatus::Approved], DraftStatus::SendFailed)
        .await?
    else {
        return Ok(None);
    };
    store
        .append_action(
            &ActionLogEntry::new(draft.request_id.clone(), "delivery", "send_failed")
                .draft(draft.id)
                .transition(DraftStatus::Approved, DraftStatus::SendFailed)
                .details(reason),
        )
        .await?;
    warn!(request_id = %draft.request_id, draft_id = %draft.id, reason, "draft marked send_failed");
    Ok(Some(draft))
}

/// Check that a request has at most one active draft.
pub async fn verify_single_active(
    store: &dyn RecordStore,
    request_id: &RequestId,
) -> Result<(), PressdeskError> {
    let active = store.count_active_drafts(request_id).await?;
    if active > 1 {
        error!(request_id = %request_id, active, "more than one active draft");
        return Err(PressdeskError::Internal(format!(
            "request {request_id} has {active} active drafts"
        )));
    }
    Ok(())
}
