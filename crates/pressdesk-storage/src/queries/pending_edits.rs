// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending edit operations. One edit per reviewer conversation; closed edits
//! are kept until the conversation opens another.

use pressdesk_core::{PressdeskError, clock};
use pressdesk_core::types::{DraftId, NotificationId, PendingEdit};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Open an edit for a conversation, replacing any earlier one there.
pub async fn upsert_pending_edit(db: &Database, edit: &PendingEdit) -> Result<(), PressdeskError> {
    let edit = edit.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO pending_edits (conversation_id, draft_id, notification_id,
                     created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(conversation_id) DO UPDATE SET
                     draft_id = excluded.draft_id,
                     notification_id = excluded.notification_id,
                     created_at = excluded.created_at,
                     expires_at = excluded.expires_at,
                     closed_at = NULL",
                params![
                    edit.conversation_id,
                    edit.draft_id.0,
                    edit.notification_id.0,
                    edit.created_at,
                    edit.expires_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_pending_edit(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<PendingEdit>, PressdeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<PendingEdit>, rusqlite::Error> {
            conn.query_row(
                "SELECT conversation_id, draft_id, notification_id, created_at, expires_at,
                     closed_at
                 FROM pending_edits WHERE conversation_id = ?1",
                params![conversation_id],
                |row| {
                    Ok(PendingEdit {
                        conversation_id: row.get(0)?,
                        draft_id: DraftId(row.get(1)?),
                        notification_id: NotificationId(row.get(2)?),
                        created_at: row.get(3)?,
                        expires_at: row.get(4)?,
                        closed_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_pending_edit(db: &Database, conversation_id: &str) -> Result<(), PressdeskError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM pending_edits WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Close every open edit aimed at a draft once it leaves `pending_review`.
pub async fn close_pending_edits_for_draft(
    db: &Database,
    draft_id: DraftId,
) -> Result<(), PressdeskError> {
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE pending_edits SET closed_at = ?1
                 WHERE draft_id = ?2 AND closed_at IS NULL",
                params![now, draft_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::drafts::{insert_draft, supersede_draft};
    use crate::queries::requests::insert_request_if_absent;
    use crate::queries::test_support::{raw, setup_db};
    use pressdesk_core::types::RequestId;

    fn edit(conversation: &str, draft_id: DraftId, card: &str) -> PendingEdit {
        PendingEdit {
            conversation_id: conversation.into(),
            draft_id,
            notification_id: NotificationId(card.into()),
            created_at: "2026-05-01T10:00:00.000Z".into(),
            expires_at: "2026-05-01T10:30:00.000Z".into(),
            closed_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_per_conversation() {
        let (db, _dir) = setup_db().await;
        insert_request_if_absent(&db, &raw("a")).await.unwrap();
        insert_request_if_absent(&db, &raw("b")).await.unwrap();
        let da = insert_draft(&db, &RequestId("a".into()), "s", "b").await.unwrap();
        let db_draft = insert_draft(&db, &RequestId("b".into()), "s", "b").await.unwrap();

        upsert_pending_edit(&db, &edit("chat-1", da.id, "chat-1:1")).await.unwrap();
        upsert_pending_edit(&db, &edit("chat-1", db_draft.id, "chat-1:2")).await.unwrap();

        let open = get_pending_edit(&db, "chat-1").await.unwrap().unwrap();
        assert_eq!(open.draft_id, db_draft.id);
        assert_eq!(open.notification_id.as_str(), "chat-1:2");

        delete_pending_edit(&db, "chat-1").await.unwrap();
        assert!(get_pending_edit(&db, "chat-1").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn superseding_a_draft_closes_its_pending_edits() {
        let (db, _dir) = setup_db().await;
        insert_request_if_absent(&db, &raw("a")).await.unwrap();
        let v1 = insert_draft(&db, &RequestId("a".into()), "s", "b").await.unwrap();
        upsert_pending_edit(&db, &edit("chat-1", v1.id, "chat-1:1")).await.unwrap();
        upsert_pending_edit(&db, &edit("chat-2", v1.id, "chat-2:1")).await.unwrap();

        supersede_draft(&db, v1.id, "s2", "b2").await.unwrap().unwrap();
        let closed = get_pending_edit(&db, "chat-1").await.unwrap().unwrap();
        assert_eq!(closed.draft_id, v1.id);
        assert!(!closed.is_open());
        assert!(!get_pending_edit(&db, "chat-2").await.unwrap().unwrap().is_open());

        // Opening a new edit in the conversation reuses the row.
        let v2 = crate::queries::drafts::active_draft(&db, &RequestId("a".into()))
            .await
            .unwrap()
            .unwrap();
        upsert_pending_edit(&db, &edit("chat-1", v2.id, "chat-1:2")).await.unwrap();
        let reopened = get_pending_edit(&db, "chat-1").await.unwrap().unwrap();
        assert_eq!(reopened.draft_id, v2.id);
        assert!(reopened.is_open());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_for_draft_only_touches_that_draft() {
        let (db, _dir) = setup_db().await;
        insert_request_if_absent(&db, &raw("a")).await.unwrap();
        insert_request_if_absent(&db, &raw("b")).await.unwrap();
        let da = insert_draft(&db, &RequestId("a".into()), "s", "b").await.unwrap();
        let dbb = insert_draft(&db, &RequestId("b".into()), "s", "b").await.unwrap();
        upsert_pending_edit(&db, &edit("chat-1", da.id, "c:1")).await.unwrap();
        upsert_pending_edit(&db, &edit("chat-2", dbb.id, "c:2")).await.unwrap();

        close_pending_edits_for_draft(&db, da.id).await.unwrap();
        assert!(!get_pending_edit(&db, "chat-1").await.unwrap().unwrap().is_open());
        assert!(get_pending_edit(&db, "chat-2").await.unwrap().unwrap().is_open());
        db.close().await.unwrap();
    }
}
