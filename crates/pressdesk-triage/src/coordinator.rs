// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review coordination: maps reviewer actions to the exact draft version they
//! were issued for and applies each at most once.
//!
//! Button presses carry the id of the review card they were pressed on, which
//! is bound to one draft version. Edited text is only accepted while the
//! conversation has an open edit for that version; text that does not reply
//! to a card is resolved through the edit alone. The first transition applied
//! to a version wins; anything later is reported back as stale.

use std::sync::Arc;

use chrono::Utc;
use pressdesk_core::clock;
use pressdesk_core::types::{
    ActionKind, Draft, DraftStatus, InboundAction, NotificationRecord, NotificationRef,
    PendingEdit, Request,
};
use pressdesk_core::PressdeskError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::context::TriageContext;
use crate::delivery::{DeliveryExecutor, DeliveryOutcome};
use crate::lifecycle::{self, ReviewerAction};

/// How an action was tied to a draft version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The action targeted a review card.
    Notification(NotificationRecord),
    /// Free text consumed by the conversation's open edit.
    PendingEdit(PendingEdit),
}

/// An action bound to the draft version it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub draft: Draft,
    pub via: Resolution,
}

impl ResolvedAction {
    fn notification_id(&self) -> &pressdesk_core::NotificationId {
        match &self.via {
            Resolution::Notification(record) => &record.id,
            Resolution::PendingEdit(edit) => &edit.notification_id,
        }
    }
}

/// The state change a reviewer action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedAction {
    Approved(Draft),
    Rejected(Draft),
    EditOpened { draft: Draft, expires_at: String },
    Superseded { retired: Draft, successor: Draft },
}

/// Result of handling one inbound reviewer action.
#[derive(Debug)]
pub enum HandleOutcome {
    Applied(AppliedAction),
    /// The draft was approved and its delivery is running.
    Dispatched {
        draft: Draft,
        delivery: JoinHandle<Result<DeliveryOutcome, PressdeskError>>,
    },
    /// Stale or unresolvable; the reviewer was told why.
    Ignored { reason: String },
}

fn accepted_from(kind: &ActionKind) -> &'static [DraftStatus] {
    match kind {
        ActionKind::Approve => &[DraftStatus::PendingReview, DraftStatus::SendFailed],
        _ => &[DraftStatus::PendingReview],
    }
}

/// Bind an inbound action to a draft version.
///
/// Fails with `StaleAction` when the version no longer accepts the action,
/// including edit text that arrives after its draft moved on. Fails with
/// `NotFound` for unknown cards, and for edit text without an unexpired edit
/// open on that version.
pub async fn resolve_action(
    ctx: &TriageContext,
    action: &InboundAction,
) -> Result<ResolvedAction, PressdeskError> {
    let store = ctx.store.as_ref();

    let (draft_id, via) = match (&action.notification_id, &action.kind) {
        (Some(id), _) => {
            let record = store
                .get_notification(id)
                .await?
                .ok_or_else(|| PressdeskError::NotFound {
                    entity: "notification",
                    id: id.to_string(),
                })?;
            (record.draft_id, Resolution::Notification(record))
        }
        (None, ActionKind::EditSubmit { .. }) => {
            let edit = conversation_edit(ctx, &action.conversation_id).await?;
            (edit.draft_id, Resolution::PendingEdit(edit))
        }
        (None, kind) => {
            return Err(PressdeskError::NotFound {
                entity: "notification",
                id: format!("<{} without a review card>", kind.name()),
            });
        }
    };

    let draft = store
        .get_draft(draft_id)
        .await?
        .ok_or_else(|| PressdeskError::NotFound {
            entity: "draft",
            id: draft_id.to_string(),
        })?;

    if !accepted_from(&action.kind).contains(&draft.status) {
        return Err(PressdeskError::StaleAction {
            draft_id: draft.id,
            status: draft.status,
        });
    }

    if matches!(action.kind, ActionKind::EditSubmit { .. }) {
        let edit = match &via {
            Resolution::PendingEdit(edit) => edit.clone(),
            Resolution::Notification(_) => conversation_edit(ctx, &action.conversation_id).await?,
        };
        if !edit.is_open() || edit.draft_id != draft.id {
            return Err(no_pending_edit(&action.conversation_id));
        }
    }

    Ok(ResolvedAction { draft, via })
}

fn no_pending_edit(conversation_id: &str) -> PressdeskError {
    PressdeskError::NotFound {
        entity: "pending edit",
        id: conversation_id.to_string(),
    }
}

/// The conversation's latest edit, open or closed. An open edit past its
/// deadline is dropped and reported as missing.
async fn conversation_edit(
    ctx: &TriageContext,
    conversation_id: &str,
) -> Result<PendingEdit, PressdeskError> {
    let store = ctx.store.as_ref();
    let edit = store
        .get_pending_edit(conversation_id)
        .await?
        .ok_or_else(|| no_pending_edit(conversation_id))?;
    let expired = clock::parse_timestamp(&edit.expires_at)
        .is_none_or(|expires| expires <= Utc::now());
    if edit.is_open() && expired {
        store.delete_pending_edit(conversation_id).await?;
        info!(
            conversation_id = %conversation_id,
            draft_id = %edit.draft_id,
            "pending edit expired"
        );
        return Err(no_pending_edit(conversation_id));
    }
    Ok(edit)
}

/// Post a review card for a draft version and remember which version it shows.
pub async fn publish_draft(
    ctx: &TriageContext,
    request: &Request,
    draft: &Draft,
) -> Result<NotificationRef, PressdeskError> {
    let card = ctx.review.notify(request, draft).await?;
    ctx.store
        .insert_notification(&NotificationRecord {
            id: card.id.clone(),
            draft_id: draft.id,
            conversation_id: card.conversation_id.clone(),
            created_at: clock::now(),
        })
        .await?;
    info!(
        request_id = %request.id,
        draft_id = %draft.id,
        version = draft.version,
        notification_id = %card.id,
        "review card posted"
    );
    Ok(card)
}

/// Apply a resolved action under the draft's lock.
pub async fn apply(
    ctx: &TriageContext,
    resolved: ResolvedAction,
    action: &InboundAction,
) -> Result<AppliedAction, PressdeskError> {
    let draft_id = resolved.draft.id;
    let _guard = ctx.lock_draft(draft_id).await;
    let store = ctx.store.as_ref();
    let actor = format!("reviewer:{}", action.actor);

    let reviewer_action = match &action.kind {
        ActionKind::Approve => ReviewerAction::Approve,
        ActionKind::Reject => ReviewerAction::Reject,
        ActionKind::EditRequest => ReviewerAction::EditRequest,
        ActionKind::EditSubmit { subject, body } => ReviewerAction::Supersede {
            subject: subject.clone(),
            body: body.clone(),
        },
    };

    let transition = lifecycle::record_reviewer_action(
        store,
        draft_id,
        resolved.draft.version,
        &reviewer_action,
        &actor,
    )
    .await?;

    let applied = match reviewer_action {
        ReviewerAction::Approve => AppliedAction::Approved(transition.draft),
        ReviewerAction::Reject => {
            ctx.forget_draft(draft_id);
            AppliedAction::Rejected(transition.draft)
        }
        ReviewerAction::EditRequest => {
            let now = Utc::now();
            let expires = now
                + chrono::Duration::from_std(ctx.settings.edit_timeout)
                    .unwrap_or_else(|_| chrono::Duration::minutes(30));
            let edit = PendingEdit {
                conversation_id: action.conversation_id.clone(),
                draft_id,
                notification_id: resolved.notification_id().clone(),
                created_at: clock::format_timestamp(now),
                expires_at: clock::format_timestamp(expires),
                closed_at: None,
            };
            store.upsert_pending_edit(&edit).await?;
            AppliedAction::EditOpened {
                draft: transition.draft,
                expires_at: edit.expires_at,
            }
        }
        ReviewerAction::Supersede { .. } => {
            let successor = transition.successor.ok_or_else(|| {
                PressdeskError::Internal(format!("supersede of draft {draft_id} made no successor"))
            })?;
            ctx.forget_draft(draft_id);
            AppliedAction::Superseded {
                retired: transition.draft,
                successor,
            }
        }
    };
    Ok(applied)
}

/// Consumes reviewer actions one at a time and dispatches approved drafts.
#[derive(Clone)]
pub struct ReviewCoordinator {
    ctx: Arc<TriageContext>,
    delivery: DeliveryExecutor,
}

impl ReviewCoordinator {
    pub fn new(ctx: Arc<TriageContext>, delivery: DeliveryExecutor) -> Self {
        Self { ctx, delivery }
    }

    /// Resolve, apply and follow up on one reviewer action.
    ///
    /// Stale and unresolvable actions are not errors: the reviewer is told
    /// and nothing changes. Storage failures propagate.
    pub async fn handle(&self, action: InboundAction) -> Result<HandleOutcome, PressdeskError> {
        let conversation = action.conversation_id.clone();
        let outcome = match resolve_action(&self.ctx, &action).await {
            Ok(resolved) => apply(&self.ctx, resolved, &action).await,
            Err(e) => Err(e),
        };

        let applied = match outcome {
            Ok(applied) => applied,
            Err(e @ (PressdeskError::StaleAction { .. } | PressdeskError::NotFound { .. })) => {
                warn!(
                    conversation_id = %conversation,
                    actor = %action.actor,
                    action = action.kind.name(),
                    error = %e,
                    "reviewer action ignored"
                );
                let reason = ignored_text(&action.kind, &e);
                self.say(&conversation, &reason).await;
                return Ok(HandleOutcome::Ignored { reason });
            }
            Err(e) => return Err(e),
        };

        match applied {
            AppliedAction::Approved(draft) => {
                self.say(
                    &conversation,
                    &format!("Approved v{}. Sending now.", draft.version),
                )
                .await;
                let delivery = self.delivery.spawn(draft.id);
                Ok(HandleOutcome::Dispatched { draft, delivery })
            }
            AppliedAction::Rejected(draft) => {
                self.say(
                    &conversation,
                    &format!("Rejected v{}. Nothing will be sent.", draft.version),
                )
                .await;
                Ok(HandleOutcome::Applied(AppliedAction::Rejected(draft)))
            }
            AppliedAction::EditOpened { draft, expires_at } => {
                self.say(
                    &conversation,
                    &format!(
                        "Editing v{}. Reply with the new text as:\nSubject: ...\nBody: ...",
                        draft.version
                    ),
                )
                .await;
                Ok(HandleOutcome::Applied(AppliedAction::EditOpened {
                    draft,
                    expires_at,
                }))
            }
            AppliedAction::Superseded { retired, successor } => {
                match self.ctx.store.get_request(&successor.request_id).await? {
                    Some(request) => {
                        if let Err(e) = publish_draft(&self.ctx, &request, &successor).await {
                            // The poll tick re-posts cards for drafts without one.
                            warn!(draft_id = %successor.id, error = %e, "could not post edited draft");
                        }
                    }
                    None => warn!(request_id = %successor.request_id, "request missing for edited draft"),
                }
                Ok(HandleOutcome::Applied(AppliedAction::Superseded {
                    retired,
                    successor,
                }))
            }
        }
    }

    async fn say(&self, conversation: &str, text: &str) {
        if let Err(e) = self.ctx.review.inform(conversation, text).await {
            warn!(conversation_id = %conversation, error = %e, "could not inform reviewer");
        }
    }
}

fn ignored_text(kind: &ActionKind, error: &PressdeskError) -> String {
    match error {
        PressdeskError::StaleAction { status, .. } if matches!(kind, ActionKind::EditSubmit { .. }) => {
            format!(
                "That edit arrived too late: this draft is already {}. Nothing was changed.",
                status.to_string().replace('_', " ")
            )
        }
        PressdeskError::StaleAction { status, .. } => format!(
            "That {} is out of date: this draft is already {}.",
            kind.name().replace('_', " "),
            status.to_string().replace('_', " ")
        ),
        PressdeskError::NotFound {
            entity: "pending edit",
            ..
        } => "No edit in progress (it may have expired). Press Edit on the draft first.".to_string(),
        _ => format!("Could not apply {}: {error}", kind.name().replace('_', " ")),
    }
}
