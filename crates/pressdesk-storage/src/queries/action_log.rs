// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only action log.

use pressdesk_core::PressdeskError;
use pressdesk_core::clock;
use pressdesk_core::types::{ActionLogEntry, ActionLogRecord, DraftId, RequestId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

pub async fn append_action(db: &Database, entry: &ActionLogEntry) -> Result<(), PressdeskError> {
    let entry = entry.clone();
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO action_log (request_id, draft_id, actor, action, old_state,
                     new_state, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.request_id.0,
                    entry.draft_id.map(|d| d.0),
                    entry.actor,
                    entry.action,
                    entry.old_state,
                    entry.new_state,
                    entry.details,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Entries for one request in insertion order.
pub async fn list_actions(
    db: &Database,
    request_id: &RequestId,
) -> Result<Vec<ActionLogRecord>, PressdeskError> {
    let rid = request_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<ActionLogRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, request_id, draft_id, actor, action, old_state, new_state,
                        details, created_at
                 FROM action_log WHERE request_id = ?1 ORDER BY id ASC",
            )?;
            stmt.query_map(params![rid], |row| {
                Ok(ActionLogRecord {
                    id: row.get(0)?,
                    entry: ActionLogEntry {
                        request_id: RequestId(row.get(1)?),
                        draft_id: row.get::<_, Option<i64>>(2)?.map(DraftId),
                        actor: row.get(3)?,
                        action: row.get(4)?,
                        old_state: row.get(5)?,
                        new_state: row.get(6)?,
                        details: row.get(7)?,
                    },
                    created_at: row.get(8)?,
                })
            })?
            .collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn entries_come_back_in_order() {
        let (db, _dir) = setup_db().await;
        let rid = RequestId("msg-42".into());

        append_action(&db, &ActionLogEntry::new(rid.clone(), "poller", "ingested"))
            .await
            .unwrap();
        append_action(
            &db,
            &ActionLogEntry::new(rid.clone(), "reviewer:7", "reject")
                .draft(DraftId(1))
                .transition("pending_review", "rejected"),
        )
        .await
        .unwrap();

        let entries = list_actions(&db, &rid).await.unwrap();
        let actions: Vec<&str> = entries.iter().map(|e| e.entry.action.as_str()).collect();
        assert_eq!(actions, vec!["ingested", "reject"]);
        assert_eq!(entries[1].entry.draft_id, Some(DraftId(1)));
        assert_eq!(entries[1].entry.new_state.as_deref(), Some("rejected"));
        assert!(list_actions(&db, &RequestId("other".into())).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
