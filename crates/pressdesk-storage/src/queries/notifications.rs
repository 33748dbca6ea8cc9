// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification message operations: which review card points at which draft version.

use pressdesk_core::PressdeskError;
use pressdesk_core::types::{DraftId, NotificationId, NotificationRecord};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: NotificationId(row.get(0)?),
        draft_id: DraftId(row.get(1)?),
        conversation_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Record a review card. A notification id is bound to one draft version
/// for life; re-inserting the same id is a no-op.
pub async fn insert_notification(
    db: &Database,
    record: &NotificationRecord,
) -> Result<(), PressdeskError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO notification_messages (id, draft_id, conversation_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    record.id.0,
                    record.draft_id.0,
                    record.conversation_id,
                    record.created_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_notification(
    db: &Database,
    id: &NotificationId,
) -> Result<Option<NotificationRecord>, PressdeskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<NotificationRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, draft_id, conversation_id, created_at
                 FROM notification_messages WHERE id = ?1",
                params![id],
                notification_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn notifications_for_draft(
    db: &Database,
    draft_id: DraftId,
) -> Result<Vec<NotificationRecord>, PressdeskError> {
    db.connection()
        .call(move |conn| -> Result<Vec<NotificationRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, draft_id, conversation_id, created_at
                 FROM notification_messages WHERE draft_id = ?1 ORDER BY created_at ASC",
            )?;
            stmt.query_map(params![draft_id.0], notification_from_row)?
                .collect()
        })
        .await
        .map_err(map_tr_err)
}
