// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pressdesk status` command implementation.
//!
//! Reads the record store directly and prints request and draft counts by
//! status, followed by every `send_failed` draft so an operator can
//! reconcile it against the sent-mail folder before re-approving.

use pressdesk_config::PressdeskConfig;
use pressdesk_core::types::DraftStatus;
use pressdesk_core::{PressdeskError, RecordStore};
use serde::Serialize;

use crate::serve::open_storage;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub requests: Vec<StatusCount>,
    pub drafts: Vec<StatusCount>,
    pub send_failed: Vec<FailedDraft>,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// A draft whose send failed and awaits manual reconciliation.
#[derive(Debug, Serialize)]
pub struct FailedDraft {
    pub draft_id: i64,
    pub request_id: String,
    pub version: u32,
    pub subject: String,
    pub reply_to: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub updated_at: String,
}

pub async fn run_status(config: &PressdeskConfig, json: bool) -> Result<(), PressdeskError> {
    let store = open_storage(config).await?;
    let report = collect_status(store.as_ref()).await;
    store.close().await?;
    let report = report?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| PressdeskError::Internal(format!("failed to encode status: {e}")))?;
        println!("{out}");
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

pub async fn collect_status(store: &dyn RecordStore) -> Result<StatusReport, PressdeskError> {
    let counts = store.status_counts().await?;
    let mut send_failed = Vec::new();
    for draft in store.list_drafts_by_status(DraftStatus::SendFailed).await? {
        let request = store.get_request(&draft.request_id).await?;
        let marker = store.get_delivery(draft.id).await?;
        send_failed.push(FailedDraft {
            draft_id: draft.id.0,
            request_id: draft.request_id.to_string(),
            version: draft.version,
            subject: draft.subject,
            reply_to: request.map(|r| r.reply_address().to_string()),
            attempts: marker.as_ref().map_or(0, |m| m.attempts),
            last_error: marker.and_then(|m| m.last_error),
            updated_at: draft.updated_at,
        });
    }

    Ok(StatusReport {
        requests: counts
            .requests
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        drafts: counts
            .drafts
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        send_failed,
    })
}

pub fn render_text(report: &StatusReport) -> String {
    let mut out = String::from("Requests:\n");
    push_counts(&mut out, &report.requests);
    out.push_str("Drafts:\n");
    push_counts(&mut out, &report.drafts);

    if report.send_failed.is_empty() {
        out.push_str("No failed sends.\n");
        return out;
    }
    out.push_str(&format!(
        "Failed sends ({}), check the sent folder before `pressdesk reapprove <draft-id>`:\n",
        report.send_failed.len()
    ));
    for failed in &report.send_failed {
        out.push_str(&format!(
            "  draft {} (v{}, request {}) to {}: {:?}\n    {} attempt(s), last error: {}\n",
            failed.draft_id,
            failed.version,
            failed.request_id,
            failed.reply_to.as_deref().unwrap_or("?"),
            failed.subject,
            failed.attempts,
            failed.last_error.as_deref().unwrap_or("none recorded"),
        ));
    }
    out
}

fn push_counts(out: &mut String, counts: &[StatusCount]) {
    if counts.is_empty() {
        out.push_str("  (none)\n");
    }
    for c in counts {
        out.push_str(&format!("  {:<24} {}\n", c.status, c.count));
    }
}

#[cfg(test)]
mod tests {
    use pressdesk_core::types::{ActionKind, RequestId};
    use pressdesk_test_utils::TestHarness;
    use pressdesk_test_utils::fixtures::{action_on, raw_message};

    use super::*;

    #[tokio::test]
    async fn empty_store_reports_no_failures() {
        let harness = TestHarness::builder().build().await.unwrap();
        let report = collect_status(harness.store()).await.unwrap();
        assert!(report.send_failed.is_empty());
        assert!(render_text(&report).contains("No failed sends."));
    }

    #[tokio::test]
    async fn failed_send_is_listed_for_reconciliation() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.mailbox.push_message(raw_message("m7")).await;
        harness.tick().await.unwrap();
        let draft = harness
            .store()
            .active_draft(&RequestId("m7".into()))
            .await
            .unwrap()
            .unwrap();
        harness
            .mailbox
            .queue_send_failure(PressdeskError::Rejected {
                message: "invalid recipient".into(),
            })
            .await;
        let card = harness.card(draft.id).await.unwrap();
        harness
            .handle_and_settle(action_on(&card, ActionKind::Approve))
            .await
            .unwrap();

        let report = collect_status(harness.store()).await.unwrap();
        assert_eq!(report.send_failed.len(), 1);
        let failed = &report.send_failed[0];
        assert_eq!(failed.draft_id, draft.id.0);
        assert_eq!(failed.request_id, "m7");
        assert_eq!(failed.reply_to.as_deref(), Some("jordan@outlet.example"));
        assert_eq!(failed.attempts, 1);
        assert!(
            failed
                .last_error
                .as_deref()
                .is_some_and(|e| e.contains("invalid recipient"))
        );
        assert!(
            report
                .drafts
                .iter()
                .any(|c| c.status == "send_failed" && c.count == 1)
        );

        let text = render_text(&report);
        assert!(text.contains(&format!("draft {} (v1, request m7)", draft.id)));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["send_failed"][0]["request_id"], "m7");
    }
}
