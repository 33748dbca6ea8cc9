// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One poll tick: fetch labeled mail, ingest, draft and post review cards.
//!
//! A tick is safe to repeat. Known source ids are skipped, requests are drafted
//! only while `new`, and a card is posted for every `pending_review` draft that
//! does not have one yet, so a tick interrupted at any point is completed by
//! the next one.

use std::collections::HashSet;

use pressdesk_core::types::{ActionLogEntry, Provider, RawMessage, Request, RequestStatus};
use pressdesk_core::{DraftStatus, PressdeskError};
use tracing::{debug, error, info, warn};

use crate::context::TriageContext;
use crate::coordinator::publish_draft;
use crate::ingest::{self, IngestOutcome};
use crate::lifecycle;

/// Counters for one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub created: usize,
    pub duplicates: usize,
    /// Digest items dropped by the relevance judge.
    pub filtered: usize,
    pub drafted: usize,
    pub generation_failures: usize,
    pub notified: usize,
}

/// Run one poll tick.
///
/// Fails only when the mailbox cannot be listed (for example an `Auth`
/// error) or the store fails; per-message problems are logged and retried on
/// the next tick.
pub async fn tick(ctx: &TriageContext) -> Result<TickReport, PressdeskError> {
    let mut report = TickReport::default();

    let messages = ctx.mailbox.list_new_labeled_messages().await?;
    report.fetched = messages.len();

    // Mailbox messages with an item that could not be stored stay unread.
    let mut unsettled: HashSet<String> = HashSet::new();
    let mut seen: Vec<String> = Vec::new();

    for raw in &messages {
        if !seen.contains(&raw.mailbox_message_id) {
            seen.push(raw.mailbox_message_id.clone());
        }
        match ingest_one(ctx, raw).await {
            Ok(Some(IngestOutcome::Created(_))) => report.created += 1,
            Ok(Some(IngestOutcome::AlreadyKnown(_))) => report.duplicates += 1,
            Ok(None) => report.filtered += 1,
            Err(e) => {
                error!(source_id = %raw.source_id, error = %e, "ingestion failed");
                unsettled.insert(raw.mailbox_message_id.clone());
            }
        }
    }

    for mailbox_id in seen.iter().filter(|id| !unsettled.contains(*id)) {
        if let Err(e) = ctx.mailbox.acknowledge(mailbox_id).await {
            warn!(mailbox_message_id = %mailbox_id, error = %e, "could not acknowledge message");
        }
    }

    for request in ctx.store.list_requests_by_status(RequestStatus::New).await? {
        match draft_request(ctx, &request).await? {
            true => report.drafted += 1,
            false => report.generation_failures += 1,
        }
    }

    report.notified = notify_pending(ctx).await?;

    if report != TickReport::default() {
        info!(
            fetched = report.fetched,
            created = report.created,
            duplicates = report.duplicates,
            filtered = report.filtered,
            drafted = report.drafted,
            generation_failures = report.generation_failures,
            notified = report.notified,
            "poll tick complete"
        );
    }
    Ok(report)
}

/// `Ok(None)` when a digest item was judged irrelevant.
async fn ingest_one(
    ctx: &TriageContext,
    raw: &RawMessage,
) -> Result<Option<IngestOutcome>, PressdeskError> {
    let store = ctx.store.as_ref();
    if let Some(judge) = &ctx.relevance
        && raw.provider == Provider::Haro
        && !ingest::is_known(store, &raw.source_id).await?
    {
        match judge.judge(raw).await {
            Ok(verdict) if !verdict.relevant => {
                debug!(source_id = %raw.source_id, reason = %verdict.reason, "digest item not relevant");
                return Ok(None);
            }
            Ok(_) => {}
            // Unjudged items are kept for the reviewer.
            Err(e) => warn!(source_id = %raw.source_id, error = %e, "relevance check failed"),
        }
    }
    ingest::ingest(store, raw).await.map(Some)
}

/// Generate the first draft of a `new` request. Returns `false` when
/// generation gave up; the request is then `drafted` without a draft and the
/// reviewer is alerted.
async fn draft_request(ctx: &TriageContext, request: &Request) -> Result<bool, PressdeskError> {
    let store = ctx.store.as_ref();
    if store.active_draft(&request.id).await?.is_some() {
        store
            .update_request_status(&request.id, RequestStatus::Drafted)
            .await?;
        return Ok(true);
    }

    let timeout = ctx.settings.generation_timeout;
    let retried = ctx
        .settings
        .generation_retry
        .run("generate", |attempt| async move {
            debug!(request_id = %request.id, attempt, "generating draft");
            match tokio::time::timeout(timeout, ctx.generator.generate(request)).await {
                Ok(result) => result,
                Err(_) => Err(PressdeskError::Timeout { duration: timeout }),
            }
        })
        .await;

    match retried.result {
        Ok(generated) => {
            match lifecycle::create_draft(store, &request.id, &generated.subject, &generated.body)
                .await
            {
                Ok(_) => Ok(true),
                // Another path drafted it first.
                Err(PressdeskError::ActiveDraftExists { .. }) => Ok(true),
                Err(e) => Err(e),
            }
        }
        Err(e) => {
            error!(
                request_id = %request.id,
                attempts = retried.attempts,
                error = %e,
                "draft generation failed"
            );
            store
                .update_request_status(&request.id, RequestStatus::Drafted)
                .await?;
            store
                .append_action(
                    &ActionLogEntry::new(request.id.clone(), "generator", "generation_failed")
                        .details(format!("attempts={} error={e}", retried.attempts)),
                )
                .await?;
            let text = format!(
                "Could not draft a reply to \"{}\" from {} ({}): {e}. Please reply manually.",
                request.subject,
                request.reply_address(),
                request.provider.label()
            );
            if let Err(e) = ctx.review.alert(&text).await {
                warn!(request_id = %request.id, error = %e, "could not alert reviewer");
            }
            Ok(false)
        }
    }
}

/// Post review cards for `pending_review` drafts that have none yet.
async fn notify_pending(ctx: &TriageContext) -> Result<usize, PressdeskError> {
    let store = ctx.store.as_ref();
    let mut posted = 0;
    for draft in store.list_drafts_by_status(DraftStatus::PendingReview).await? {
        if !store.notifications_for_draft(draft.id).await?.is_empty() {
            continue;
        }
        let Some(request) = store.get_request(&draft.request_id).await? else {
            warn!(draft_id = %draft.id, "draft without request");
            continue;
        };
        match publish_draft(ctx, &request, &draft).await {
            Ok(_) => posted += 1,
            Err(e) => warn!(draft_id = %draft.id, error = %e, "could not post review card"),
        }
    }
    Ok(posted)
}
