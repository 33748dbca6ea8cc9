// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock draft generator and relevance judge.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pressdesk_core::types::{
    AdapterType, GeneratedDraft, HealthStatus, RawMessage, RelevanceVerdict, Request,
};
use pressdesk_core::{DraftGenerator, PluginAdapter, PressdeskError, RelevanceJudge};

/// A draft generator that replays queued results.
///
/// When the queue is empty it answers with a canned draft derived from the
/// request subject.
#[derive(Default)]
pub struct MockGenerator {
    script: Mutex<VecDeque<Result<GeneratedDraft, PressdeskError>>>,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful draft.
    pub async fn queue_draft(&self, subject: &str, body: &str) {
        self.script.lock().await.push_back(Ok(GeneratedDraft {
            subject: subject.to_string(),
            body: body.to_string(),
        }));
    }

    /// Queue a failure.
    pub async fn queue_failure(&self, err: PressdeskError) {
        self.script.lock().await.push_back(Err(err));
    }

    /// Number of `generate()` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        Ok(())
    }
}

#[async_trait]
impl DraftGenerator for MockGenerator {
    async fn generate(&self, request: &Request) -> Result<GeneratedDraft, PressdeskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.script.lock().await.pop_front() {
            return next;
        }
        Ok(GeneratedDraft {
            subject: format!("Re: {}", request.subject),
            body: format!(
                "Hi {},\n\nHappy to help with \"{}\".\n\nBest regards,",
                request.sender_name, request.subject
            ),
        })
    }
}

/// A relevance judge that rejects a fixed set of source ids.
#[derive(Default)]
pub struct MockRelevanceJudge {
    irrelevant: HashSet<String>,
    calls: AtomicUsize,
}

impl MockRelevanceJudge {
    pub fn rejecting<I, S>(source_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            irrelevant: source_ids.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockRelevanceJudge {
    fn name(&self) -> &str {
        "mock-relevance"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, PressdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PressdeskError> {
        Ok(())
    }
}

#[async_trait]
impl RelevanceJudge for MockRelevanceJudge {
    async fn judge(&self, msg: &RawMessage) -> Result<RelevanceVerdict, PressdeskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let relevant = !self.irrelevant.contains(&msg.source_id);
        Ok(RelevanceVerdict {
            relevant,
            reason: if relevant { "matches" } else { "off topic" }.to_string(),
        })
    }
}
