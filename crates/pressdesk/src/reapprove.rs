// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pressdesk reapprove <draft-id>`: operator re-approval from the shell.
//!
//! Only `send_failed` drafts are accepted. The approval goes through the
//! same compare-and-set transition as a reviewer's button press and clears
//! the old delivery marker, then the send runs in this process.

use std::sync::Arc;

use pressdesk_config::PressdeskConfig;
use pressdesk_core::types::{DraftId, DraftStatus};
use pressdesk_core::{PressdeskError, ReviewChannel};
use pressdesk_telegram::TelegramReviewChannel;
use pressdesk_triage::lifecycle::{self, ReviewerAction};
use pressdesk_triage::{DeliveryExecutor, DeliveryOutcome, TriageContext};
use tracing::info;

use crate::serve::{build_context, init_tracing, open_storage};

const OPERATOR: &str = "operator";

pub async fn run_reapprove(config: &PressdeskConfig, draft_id: DraftId) -> Result<(), PressdeskError> {
    init_tracing(&config.service.log_level);

    let store = open_storage(config).await?;
    // Not connected: only used to tell reviewers how the send went.
    let review: Arc<dyn ReviewChannel> = Arc::new(TelegramReviewChannel::new(
        &config.telegram,
        config.service.action_queue_capacity,
    )?);
    let ctx = Arc::new(build_context(config, store, review).await?);

    let outcome = reapprove(ctx.clone(), draft_id).await;
    ctx.store.close().await?;

    match outcome? {
        DeliveryOutcome::Sent { draft, attempts } => {
            println!(
                "draft {} v{} sent ({} attempt(s)), message id {}",
                draft.id,
                draft.version,
                attempts,
                draft.outbound_message_id.as_deref().unwrap_or("?")
            );
            Ok(())
        }
        DeliveryOutcome::Failed {
            attempts, error, ..
        } => Err(PressdeskError::Transient {
            message: format!("send failed again after {attempts} attempt(s): {error}"),
            source: None,
        }),
        DeliveryOutcome::Skipped { reason } => {
            println!("draft {draft_id} not sent: {reason}");
            Ok(())
        }
    }
}

/// Approve a `send_failed` draft as the operator and deliver it.
pub async fn reapprove(
    ctx: Arc<TriageContext>,
    draft_id: DraftId,
) -> Result<DeliveryOutcome, PressdeskError> {
    let draft = ctx
        .store
        .get_draft(draft_id)
        .await?
        .ok_or_else(|| PressdeskError::NotFound {
            entity: "draft",
            id: draft_id.to_string(),
        })?;
    if draft.status != DraftStatus::SendFailed {
        return Err(PressdeskError::StaleAction {
            draft_id,
            status: draft.status,
        });
    }

    {
        let _guard = ctx.lock_draft(draft_id).await;
        lifecycle::record_reviewer_action(
            ctx.store.as_ref(),
            draft_id,
            draft.version,
            &ReviewerAction::Approve,
            OPERATOR,
        )
        .await?;
    }
    info!(draft_id = %draft_id, version = draft.version, "draft re-approved by operator");

    DeliveryExecutor::new(ctx).deliver(draft_id).await
}
