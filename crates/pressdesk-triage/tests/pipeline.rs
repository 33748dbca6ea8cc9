// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the triage pipeline.
//!
//! Each test creates an isolated TestHarness with a temp SQLite database and
//! mock collaborators. Tests are independent and order-insensitive.

use std::time::Duration;

use pressdesk_core::types::{ActionKind, DeliveryState, DraftStatus, RequestId, RequestStatus};
use pressdesk_core::{MailboxAdapter, PressdeskError};
use pressdesk_test_utils::fixtures::{action_on, edit_text, haro_item, raw_message};
use pressdesk_test_utils::{MockRelevanceJudge, TestHarness};
use pressdesk_triage::coordinator::AppliedAction;
use pressdesk_triage::delivery::{INTERRUPTED_SEND, outbound_for};
use pressdesk_triage::lifecycle::{self, ReviewerAction};
use pressdesk_triage::{DeliveryOutcome, HandleOutcome};
use tracing_test::traced_test;

async fn harness_with_draft(source_id: &str) -> (TestHarness, pressdesk_core::Draft) {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.mailbox.push_message(raw_message(source_id)).await;
    harness.tick().await.unwrap();
    let draft = harness
        .store()
        .active_draft(&RequestId(source_id.into()))
        .await
        .unwrap()
        .expect("tick should draft the request");
    (harness, draft)
}

// ---- Ingestion ----

#[tokio::test]
async fn repeated_polls_create_one_request() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.mailbox.push_message(raw_message("m1")).await;

    for _ in 0..3 {
        harness.tick().await.unwrap();
        // The mailbox keeps listing the message, as if marking it read failed.
        harness.mailbox.unacknowledge("m1").await;
    }
    harness.mailbox.push_message(raw_message("m1")).await;
    let report = harness.tick().await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.duplicates, 2);

    let id = RequestId("m1".into());
    assert!(harness.store().get_request(&id).await.unwrap().is_some());
    assert_eq!(harness.store().list_drafts(&id).await.unwrap().len(), 1);
    assert_eq!(harness.generator.calls(), 1);
    assert_eq!(harness.review.cards().await.len(), 1);
    let counts = harness.store().status_counts().await.unwrap();
    let total: u64 = counts.requests.iter().map(|(_, n)| n).sum();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn digest_items_are_judged_and_acknowledged_once() {
    let harness = TestHarness::builder()
        .with_relevance(MockRelevanceJudge::rejecting(["d1::q2"]))
        .build()
        .await
        .unwrap();
    for n in 1..=3 {
        harness.mailbox.push_message(haro_item("d1", n)).await;
    }

    let report = harness.tick().await.unwrap();
    assert_eq!(report.fetched, 3);
    assert_eq!(report.created, 2);
    assert_eq!(report.filtered, 1);
    assert_eq!(harness.mailbox.acknowledged().await, vec!["d1".to_string()]);
    assert!(
        harness
            .store()
            .get_request(&RequestId("d1::q2".into()))
            .await
            .unwrap()
            .is_none()
    );
    let q3 = harness
        .store()
        .get_request(&RequestId("d1::q3".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(q3.reply_address(), "query-3@helpareporter.example");
}

#[tokio::test]
async fn mailbox_auth_failure_aborts_only_that_tick() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.mailbox.push_message(raw_message("m1")).await;
    harness
        .mailbox
        .fail_next_list(PressdeskError::Auth {
            message: "refresh token revoked".into(),
        })
        .await;

    let err = harness.tick().await.unwrap_err();
    assert!(matches!(err, PressdeskError::Auth { .. }));
    assert!(
        harness
            .store()
            .get_request(&RequestId("m1".into()))
            .await
            .unwrap()
            .is_none()
    );

    let report = harness.tick().await.unwrap();
    assert_eq!(report.created, 1);
}

// ---- Drafting ----

#[tokio::test]
async fn exhausted_generation_leaves_request_drafted_and_alerts() {
    let harness = TestHarness::builder()
        .with_generation_attempts(2)
        .build()
        .await
        .unwrap();
    for _ in 0..2 {
        harness
            .generator
            .queue_failure(PressdeskError::generation("model overloaded"))
            .await;
    }
    harness.mailbox.push_message(raw_message("m1")).await;

    let report = harness.tick().await.unwrap();
    assert_eq!(report.generation_failures, 1);
    assert_eq!(harness.generator.calls(), 2);

    let id = RequestId("m1".into());
    let request = harness.store().get_request(&id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Drafted);
    assert!(harness.store().list_drafts(&id).await.unwrap().is_empty());
    let alerts = harness.review.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Looking for fintech founders"));
    let actions = harness.store().list_actions(&id).await.unwrap();
    assert!(actions.iter().any(|a| a.entry.action == "generation_failed"));

    // Not retried on later ticks.
    harness.tick().await.unwrap();
    assert_eq!(harness.generator.calls(), 2);
}

#[tokio::test]
async fn transient_generation_failure_is_retried() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .generator
        .queue_failure(PressdeskError::generation("503"))
        .await;
    harness
        .generator
        .queue_draft("Re: fintech", "Happy to help.")
        .await;
    harness.mailbox.push_message(raw_message("m1")).await;

    let report = harness.tick().await.unwrap();
    assert_eq!(report.drafted, 1);
    let draft = harness
        .store()
        .active_draft(&RequestId("m1".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft.body, "Happy to help.");
    assert_eq!(draft.version, 1);
}

#[tokio::test]
async fn missed_review_card_is_posted_next_tick() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.review.set_notify_failing(true);
    harness.mailbox.push_message(raw_message("m1")).await;

    let first = harness.tick().await.unwrap();
    assert_eq!(first.drafted, 1);
    assert_eq!(first.notified, 0);

    harness.review.set_notify_failing(false);
    let second = harness.tick().await.unwrap();
    assert_eq!(second.notified, 1);
    let third = harness.tick().await.unwrap();
    assert_eq!(third.notified, 0);
}

// ---- Review ----

#[tokio::test]
async fn rejecting_msg_42_sends_nothing() {
    let (harness, v1) = harness_with_draft("msg-42").await;
    let card = harness.card(v1.id).await.unwrap();

    let outcome = harness
        .handle(action_on(&card, ActionKind::Reject))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        HandleOutcome::Applied(AppliedAction::Rejected(_))
    ));

    let id = RequestId("msg-42".into());
    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::Rejected);
    let request = harness.store().get_request(&id).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::Drafted);
    assert_eq!(harness.mailbox.send_calls().await.len(), 0);
    assert!(harness.store().active_draft(&id).await.unwrap().is_none());
}

#[tokio::test]
#[traced_test]
async fn edit_cycle_supersedes_and_stales_old_card() {
    let (harness, v1) = harness_with_draft("m1").await;
    let v1_card = harness.card(v1.id).await.unwrap();

    harness
        .handle(action_on(&v1_card, ActionKind::EditRequest))
        .await
        .unwrap();
    let outcome = harness
        .handle(edit_text("Re: fintech founders", "A shorter, sharper answer."))
        .await
        .unwrap();
    let HandleOutcome::Applied(AppliedAction::Superseded { retired, successor }) = outcome else {
        panic!("expected a supersede, got {outcome:?}");
    };
    assert_eq!(retired.status, DraftStatus::EditedPendingResend);
    assert_eq!(successor.version, 2);
    assert_eq!(successor.status, DraftStatus::PendingReview);
    assert_eq!(successor.body, "A shorter, sharper answer.");

    // The new version got its own card.
    let v2_card = harness.card(successor.id).await.unwrap();
    assert_ne!(v2_card, v1_card);

    // Approving from the old card changes nothing.
    let stale = harness
        .handle(action_on(&v1_card, ActionKind::Approve))
        .await
        .unwrap();
    assert!(matches!(stale, HandleOutcome::Ignored { .. }));
    assert!(logs_contain("reviewer action ignored"));
    let informed = harness.review.informed().await;
    assert!(informed.last().unwrap().1.contains("out of date"));

    let id = RequestId("m1".into());
    assert_eq!(harness.store().count_active_drafts(&id).await.unwrap(), 1);
    let active = harness.store().active_draft(&id).await.unwrap().unwrap();
    assert_eq!(active.id, successor.id);
    assert_eq!(harness.mailbox.send_calls().await.len(), 0);
}

#[tokio::test]
async fn edit_text_after_timeout_is_refused() {
    let harness = TestHarness::builder()
        .with_edit_timeout(Duration::ZERO)
        .build()
        .await
        .unwrap();
    harness.mailbox.push_message(raw_message("m1")).await;
    harness.tick().await.unwrap();
    let v1 = harness
        .store()
        .active_draft(&RequestId("m1".into()))
        .await
        .unwrap()
        .unwrap();
    let card = harness.card(v1.id).await.unwrap();

    harness
        .handle(action_on(&card, ActionKind::EditRequest))
        .await
        .unwrap();
    let outcome = harness.handle(edit_text("s", "b")).await.unwrap();
    assert!(matches!(outcome, HandleOutcome::Ignored { .. }));
    let informed = harness.review.informed().await;
    assert!(informed.last().unwrap().1.contains("No edit in progress"));

    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::PendingReview);
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn edit_text_after_approval_is_stale() {
    let (harness, v1) = harness_with_draft("m1").await;
    let card = harness.card(v1.id).await.unwrap();

    harness
        .handle(action_on(&card, ActionKind::EditRequest))
        .await
        .unwrap();
    let approved = harness
        .handle(action_on(&card, ActionKind::Approve))
        .await
        .unwrap();
    let HandleOutcome::Dispatched { delivery, .. } = approved else {
        panic!("expected a dispatched delivery, got {approved:?}");
    };
    delivery.await.unwrap().unwrap();

    let late = harness.handle(edit_text("late", "late body")).await.unwrap();
    assert!(matches!(late, HandleOutcome::Ignored { .. }));
    let informed = harness.review.informed().await;
    let told = &informed.last().unwrap().1;
    assert!(told.contains("too late"), "reviewer was told: {told}");
    assert!(told.contains("sent"));

    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::Sent);
    assert_eq!(harness.store().list_drafts(&v1.request_id).await.unwrap().len(), 1);
    assert_eq!(harness.mailbox.send_calls().await.len(), 1);
}

#[tokio::test]
async fn edit_text_after_rejection_is_stale() {
    let (harness, v1) = harness_with_draft("m1").await;
    let card = harness.card(v1.id).await.unwrap();

    harness
        .handle(action_on(&card, ActionKind::EditRequest))
        .await
        .unwrap();
    harness
        .handle(action_on(&card, ActionKind::Reject))
        .await
        .unwrap();

    let late = harness.handle(edit_text("late", "late body")).await.unwrap();
    let HandleOutcome::Ignored { reason } = late else {
        panic!("expected the edit to be ignored, got {late:?}");
    };
    assert!(reason.contains("already rejected"), "reason: {reason}");
    assert!(
        harness
            .store()
            .active_draft(&v1.request_id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn edit_reply_needs_an_open_edit() {
    let (harness, v1) = harness_with_draft("m1").await;
    let card = harness.card(v1.id).await.unwrap();
    let submit = ActionKind::EditSubmit {
        subject: "Re: fintech founders".into(),
        body: "Replying straight to the card.".into(),
    };

    let refused = harness
        .handle(action_on(&card, submit.clone()))
        .await
        .unwrap();
    let HandleOutcome::Ignored { reason } = refused else {
        panic!("expected the edit to be refused, got {refused:?}");
    };
    assert!(reason.contains("No edit in progress"));
    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::PendingReview);

    harness
        .handle(action_on(&card, ActionKind::EditRequest))
        .await
        .unwrap();
    let outcome = harness.handle(action_on(&card, submit)).await.unwrap();
    let HandleOutcome::Applied(AppliedAction::Superseded { successor, .. }) = outcome else {
        panic!("expected a supersede, got {outcome:?}");
    };
    assert_eq!(successor.version, 2);
    assert_eq!(successor.body, "Replying straight to the card.");
}

#[tokio::test]
async fn unresolvable_actions_are_ignored() {
    let (harness, v1) = harness_with_draft("m1").await;

    let unknown = pressdesk_core::NotificationId("review-chat:999".into());
    let outcome = harness
        .handle(action_on(&unknown, ActionKind::Approve))
        .await
        .unwrap();
    assert!(matches!(outcome, HandleOutcome::Ignored { .. }));

    let stray = harness.handle(edit_text("s", "b")).await.unwrap();
    assert!(matches!(stray, HandleOutcome::Ignored { .. }));

    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::PendingReview);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_actions_apply_once() {
    let (harness, v1) = harness_with_draft("m1").await;
    let card = harness.card(v1.id).await.unwrap();

    let (a, b) = tokio::join!(
        harness.handle(action_on(&card, ActionKind::Approve)),
        harness.handle(action_on(&card, ActionKind::Reject)),
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    let ignored = outcomes
        .iter()
        .filter(|o| matches!(o, HandleOutcome::Ignored { .. }))
        .count();
    assert_eq!(ignored, 1, "exactly one action should lose: {outcomes:?}");

    for outcome in outcomes {
        if let HandleOutcome::Dispatched { delivery, .. } = outcome {
            delivery.await.unwrap().unwrap();
        }
    }

    let actions = harness
        .store()
        .list_actions(&RequestId("m1".into()))
        .await
        .unwrap();
    let from_review = actions
        .iter()
        .filter(|a| a.entry.old_state.as_deref() == Some("pending_review"))
        .count();
    assert_eq!(from_review, 1);
    assert!(harness.mailbox.sent_count().await <= 1);
}

// ---- Delivery ----

#[tokio::test]
async fn two_transient_failures_then_sent() {
    let (harness, v1) = harness_with_draft("m1").await;
    for _ in 0..2 {
        harness
            .mailbox
            .queue_send_failure(PressdeskError::transient("connection reset"))
            .await;
    }
    let card = harness.card(v1.id).await.unwrap();

    let outcome = harness
        .handle_and_settle(action_on(&card, ActionKind::Approve))
        .await
        .unwrap()
        .unwrap();
    let DeliveryOutcome::Sent { draft, attempts } = outcome else {
        panic!("expected a send, got {outcome:?}");
    };
    assert_eq!(attempts, 3);
    assert_eq!(draft.status, DraftStatus::Sent);

    let sent = harness.mailbox.sent_emails().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(harness.mailbox.send_calls().await.len(), 3);
    let (email, receipt) = &sent[0];
    assert_eq!(email.thread_id.as_deref(), Some("thread-m1"));
    assert_eq!(email.in_reply_to.as_deref(), Some("<m1@mail.example>"));

    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(
        stored.outbound_message_id.as_deref(),
        Some(receipt.outbound_message_id.as_str())
    );
    let marker = harness.store().get_delivery(v1.id).await.unwrap().unwrap();
    assert_eq!(marker.state, DeliveryState::Confirmed);
    assert_eq!(marker.attempts, 3);
    let request = harness
        .store()
        .get_request(&RequestId("m1".into()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, RequestStatus::Closed);
    assert!(
        harness
            .review
            .informed()
            .await
            .iter()
            .any(|(_, text)| text.starts_with("Sent v1"))
    );
}

#[tokio::test]
async fn fatal_send_failure_then_manual_reapproval() {
    let (harness, v1) = harness_with_draft("m1").await;
    harness
        .mailbox
        .queue_send_failure(PressdeskError::Rejected {
            message: "invalid recipient".into(),
        })
        .await;
    let card = harness.card(v1.id).await.unwrap();

    let outcome = harness
        .handle_and_settle(action_on(&card, ActionKind::Approve))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        outcome,
        DeliveryOutcome::Failed {
            retryable: false,
            attempts: 1,
            ..
        }
    ));
    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::SendFailed);
    assert!(
        harness
            .review
            .informed()
            .await
            .iter()
            .any(|(_, text)| text.contains("failed after 1 attempt"))
    );

    // Re-approving from the same card starts a fresh send.
    let retry = harness
        .handle_and_settle(action_on(&card, ActionKind::Approve))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(retry, DeliveryOutcome::Sent { attempts: 1, .. }));
    assert_eq!(harness.mailbox.sent_count().await, 1);
}

#[tokio::test]
async fn exhausted_retries_mark_send_failed() {
    let (harness, v1) = harness_with_draft("m1").await;
    for _ in 0..3 {
        harness
            .mailbox
            .queue_send_failure(PressdeskError::transient("quota exceeded"))
            .await;
    }
    let card = harness.card(v1.id).await.unwrap();

    let outcome = harness
        .handle_and_settle(action_on(&card, ActionKind::Approve))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        outcome,
        DeliveryOutcome::Failed {
            retryable: true,
            attempts: 3,
            ..
        }
    ));
    let marker = harness.store().get_delivery(v1.id).await.unwrap().unwrap();
    assert_eq!(marker.state, DeliveryState::Failed);
    assert_eq!(harness.mailbox.sent_count().await, 0);
}

#[tokio::test]
async fn crash_between_send_and_mark_sent_never_resends() {
    let (mut harness, v1) = harness_with_draft("m1").await;
    let store = harness.store();
    lifecycle::record_reviewer_action(store, v1.id, 1, &ReviewerAction::Approve, "reviewer:editor")
        .await
        .unwrap();

    // The send goes out, then the process dies before recording it.
    store.begin_delivery_attempt(v1.id).await.unwrap();
    let request = store
        .get_request(&RequestId("m1".into()))
        .await
        .unwrap()
        .unwrap();
    let approved = store.get_draft(v1.id).await.unwrap().unwrap();
    harness
        .mailbox
        .send(&outbound_for(&request, &approved))
        .await
        .unwrap();

    harness.restart().await.unwrap();
    let report = harness.delivery.recover().await.unwrap();
    assert_eq!(report.quarantined, vec![v1.id]);
    assert!(report.resumed.is_empty());

    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::SendFailed);
    assert_eq!(harness.mailbox.send_calls().await.len(), 1);
    assert!(!harness.review.alerts().await.is_empty());
    let actions = harness
        .store()
        .list_actions(&RequestId("m1".into()))
        .await
        .unwrap();
    assert!(
        actions
            .iter()
            .any(|a| a.entry.details.as_deref() == Some(INTERRUPTED_SEND))
    );
}

#[tokio::test]
async fn approved_draft_without_attempt_is_resumed_after_restart() {
    let (mut harness, v1) = harness_with_draft("m1").await;
    lifecycle::record_reviewer_action(
        harness.store(),
        v1.id,
        1,
        &ReviewerAction::Approve,
        "reviewer:editor",
    )
    .await
    .unwrap();

    harness.restart().await.unwrap();
    let report = harness.delivery.recover().await.unwrap();
    assert_eq!(report.resumed, vec![v1.id]);
    harness.delivery.drain(Duration::from_secs(5)).await;

    let stored = harness.store().get_draft(v1.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DraftStatus::Sent);
    assert_eq!(harness.mailbox.sent_count().await, 1);
}
