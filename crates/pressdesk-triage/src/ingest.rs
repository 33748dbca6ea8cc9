// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent ingestion of raw mailbox messages.
//!
//! The source id is the request id. Uniqueness is enforced by the store
//! (`INSERT .. ON CONFLICT DO NOTHING`), so a message seen twice, by the same
//! poller or a concurrent one, yields exactly one request.

use pressdesk_core::types::{ActionLogEntry, RawMessage, Request, RequestId};
use pressdesk_core::{PressdeskError, RecordStore};
use tracing::{debug, info};

/// What ingesting a raw message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Created(Request),
    AlreadyKnown(RequestId),
}

/// Whether a source id has already been ingested.
pub async fn is_known(store: &dyn RecordStore, source_id: &str) -> Result<bool, PressdeskError> {
    Ok(store
        .get_request(&RequestId(source_id.to_string()))
        .await?
        .is_some())
}

/// Create a request in status `new` unless the source message is already known.
pub async fn ingest(
    store: &dyn RecordStore,
    raw: &RawMessage,
) -> Result<IngestOutcome, PressdeskError> {
    let id = RequestId(raw.source_id.clone());
    if is_known(store, &raw.source_id).await? {
        debug!(request_id = %id, "source message already known");
        return Ok(IngestOutcome::AlreadyKnown(id));
    }

    match store.insert_request_if_absent(raw).await? {
        Some(request) => {
            store
                .append_action(
                    &ActionLogEntry::new(id.clone(), "poller", "ingested")
                        .created(request.status)
                        .details(format!("provider={} subject={}", request.provider, request.subject)),
                )
                .await?;
            info!(request_id = %id, provider = %request.provider, "request ingested");
            Ok(IngestOutcome::Created(request))
        }
        // Lost a race with another insert between the lookup and the write.
        None => Ok(IngestOutcome::AlreadyKnown(id)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pressdesk_core::types::RequestStatus;
    use pressdesk_storage::SqliteStorage;
    use pressdesk_test_utils::fixtures::raw_message;
    use tempfile::{TempDir, tempdir};
    use tokio::task::JoinSet;

    use super::*;

    async fn store() -> (SqliteStorage, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ingest.db");
        let storage = SqliteStorage::open(path.to_str().unwrap()).await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn second_ingest_is_already_known() {
        let (store, _dir) = store().await;
        let raw = raw_message("msg-42");

        let first = ingest(&store, &raw).await.unwrap();
        let IngestOutcome::Created(request) = first else {
            panic!("expected Created, got {first:?}");
        };
        assert_eq!(request.id, RequestId("msg-42".into()));
        assert_eq!(request.status, RequestStatus::New);

        let second = ingest(&store, &raw).await.unwrap();
        assert_eq!(second, IngestOutcome::AlreadyKnown(RequestId("msg-42".into())));

        let log = store.list_actions(&request.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].entry.action, "ingested");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ingest_creates_one_request() {
        let (store, _dir) = store().await;
        let store = Arc::new(store);

        let mut tasks = JoinSet::new();
        for _ in 0..16 {
            let store = store.clone();
            tasks.spawn(async move { ingest(store.as_ref(), &raw_message("msg-42")).await });
        }
        let mut created = 0;
        let mut known = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap().unwrap() {
                IngestOutcome::Created(_) => created += 1,
                IngestOutcome::AlreadyKnown(id) => {
                    assert_eq!(id, RequestId("msg-42".into()));
                    known += 1;
                }
            }
        }
        assert_eq!(created, 1);
        assert_eq!(known, 15);

        let id = RequestId("msg-42".into());
        let log = store.list_actions(&id).await.unwrap();
        let ingested = log.iter().filter(|r| r.entry.action == "ingested").count();
        assert_eq!(ingested, 1);
        let counts = store.status_counts().await.unwrap();
        let total: u64 = counts.requests.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn unknown_source_is_not_known() {
        let (store, _dir) = store().await;
        assert!(!is_known(&store, "never-seen").await.unwrap());
        ingest(&store, &raw_message("seen")).await.unwrap();
        assert!(is_known(&store, "seen").await.unwrap());
    }
}
