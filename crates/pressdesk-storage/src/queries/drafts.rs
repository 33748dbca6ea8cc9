// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Draft operations.
//!
//! Status changes are compare-and-set updates (`WHERE id = ? AND status IN (..)`)
//! so two racing transitions on the same version cannot both succeed. The
//! partial unique index `idx_drafts_one_active` backs the one-active-draft rule.

use pressdesk_core::PressdeskError;
use pressdesk_core::clock;
use pressdesk_core::types::{Draft, DraftId, DraftStatus, RequestId, SentEmail};
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{DRAFT_COLUMNS, draft_from_row};

const ACTIVE_STATUSES: &str = "'pending_review', 'approved', 'send_failed'";

enum InsertOutcome {
    Inserted(Draft),
    ActiveExists,
    MissingRequest,
}

fn select_draft(conn: &Connection, id: i64) -> rusqlite::Result<Draft> {
    conn.query_row(
        &format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1"),
        params![id],
        draft_from_row,
    )
}

/// Insert the next version for a request inside an open transaction.
fn insert_next_version(
    tx: &Transaction<'_>,
    request_id: &str,
    subject: &str,
    body: &str,
    now: &str,
) -> rusqlite::Result<i64> {
    let next: u32 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM drafts WHERE request_id = ?1",
        params![request_id],
        |row| row.get(0),
    )?;
    tx.execute(
        "INSERT INTO drafts (request_id, version, subject, body, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending_review', ?5, ?5)",
        params![request_id, next, subject, body, now],
    )?;
    Ok(tx.last_insert_rowid())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Create version `max + 1` in `pending_review` and move the request to
/// `drafted`. Fails with `ActiveDraftExists` when the request already has an
/// active draft.
pub async fn insert_draft(
    db: &Database,
    request_id: &RequestId,
    subject: &str,
    body: &str,
) -> Result<Draft, PressdeskError> {
    let rid = request_id.0.clone();
    let subject = subject.to_string();
    let body = body.to_string();
    let now = clock::now();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<InsertOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM requests WHERE id = ?1",
                    params![rid],
                    |row| row.get(0),
                )
                .optional()?;
            if status.is_none() {
                return Ok(InsertOutcome::MissingRequest);
            }
            let active: i64 = tx.query_row(
                &format!(
                    "SELECT COUNT(*) FROM drafts WHERE request_id = ?1 AND status IN ({ACTIVE_STATUSES})"
                ),
                params![rid],
                |row| row.get(0),
            )?;
            if active > 0 {
                return Ok(InsertOutcome::ActiveExists);
            }
            let id = match insert_next_version(&tx, &rid, &subject, &body, &now) {
                Ok(id) => id,
                Err(e) if is_constraint_violation(&e) => return Ok(InsertOutcome::ActiveExists),
                Err(e) => return Err(e),
            };
            tx.execute(
                "UPDATE requests SET status = 'drafted', updated_at = ?1
                 WHERE id = ?2 AND status != 'closed'",
                params![now, rid],
            )?;
            let draft = select_draft(&tx, id)?;
            tx.commit()?;
            Ok(InsertOutcome::Inserted(draft))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        InsertOutcome::Inserted(draft) => Ok(draft),
        InsertOutcome::ActiveExists => Err(PressdeskError::ActiveDraftExists {
            request_id: request_id.clone(),
        }),
        InsertOutcome::MissingRequest => Err(PressdeskError::NotFound {
            entity: "request",
            id: request_id.0.clone(),
        }),
    }
}

pub async fn get_draft(db: &Database, id: DraftId) -> Result<Option<Draft>, PressdeskError> {
    db.connection()
        .call(move |conn| -> Result<Option<Draft>, rusqlite::Error> {
            select_draft(conn, id.0).optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn active_draft(
    db: &Database,
    request_id: &RequestId,
) -> Result<Option<Draft>, PressdeskError> {
    let rid = request_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Draft>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {DRAFT_COLUMNS} FROM drafts
                     WHERE request_id = ?1 AND status IN ({ACTIVE_STATUSES})"
                ),
                params![rid],
                draft_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Every version of a request's draft, oldest first.
pub async fn list_drafts(db: &Database, request_id: &RequestId) -> Result<Vec<Draft>, PressdeskError> {
    let rid = request_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<Draft>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DRAFT_COLUMNS} FROM drafts WHERE request_id = ?1 ORDER BY version ASC"
            ))?;
            stmt.query_map(params![rid], draft_from_row)?.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_drafts_by_status(
    db: &Database,
    status: DraftStatus,
) -> Result<Vec<Draft>, PressdeskError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Draft>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DRAFT_COLUMNS} FROM drafts WHERE status = ?1 ORDER BY id ASC"
            ))?;
            stmt.query_map(params![status], draft_from_row)?.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Compare-and-set a draft's status. `Ok(None)` when the stored status was
/// not one of `from`.
pub async fn transition_draft(
    db: &Database,
    id: DraftId,
    from: &[DraftStatus],
    to: DraftStatus,
) -> Result<Option<Draft>, PressdeskError> {
    if from.is_empty() {
        return Ok(None);
    }
    let from: Vec<String> = from.iter().map(ToString::to_string).collect();
    let to = to.to_string();
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<Option<Draft>, rusqlite::Error> {
            let placeholders = (0..from.len())
                .map(|i| format!("?{}", i + 4))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE drafts SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status IN ({placeholders})"
            );
            let mut values: Vec<rusqlite::types::Value> = vec![
                to.into(),
                now.into(),
                id.0.into(),
            ];
            values.extend(from.into_iter().map(rusqlite::types::Value::from));
            let updated = conn.execute(&sql, params_from_iter(values))?;
            if updated == 0 {
                return Ok(None);
            }
            select_draft(conn, id.0).map(Some)
        })
        .await
        .map_err(map_tr_err)
}

/// Retire a `pending_review` version as `edited_pending_resend`, close its
/// pending edits and create the next version from the edited text, all in one
/// transaction. Returns the new version, or `None` if the old one was no
/// longer pending review.
pub async fn supersede_draft(
    db: &Database,
    id: DraftId,
    subject: &str,
    body: &str,
) -> Result<Option<Draft>, PressdeskError> {
    let subject = subject.to_string();
    let body = body.to_string();
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<Option<Draft>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let retired = tx.execute(
                "UPDATE drafts SET status = 'edited_pending_resend', updated_at = ?1
                 WHERE id = ?2 AND status = 'pending_review'",
                params![now, id.0],
            )?;
            if retired == 0 {
                return Ok(None);
            }
            let request_id: String = tx.query_row(
                "SELECT request_id FROM drafts WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )?;
            tx.execute(
                "UPDATE pending_edits SET closed_at = ?1
                 WHERE draft_id = ?2 AND closed_at IS NULL",
                params![now, id.0],
            )?;
            let new_id = insert_next_version(&tx, &request_id, &subject, &body, &now)?;
            let draft = select_draft(&tx, new_id)?;
            tx.commit()?;
            Ok(Some(draft))
        })
        .await
        .map_err(map_tr_err)
}

/// Finalize a successful send: `approved` -> `sent` with outbound ids, the
/// delivery marker confirmed and the request closed. `None` if the draft was
/// not `approved`.
pub async fn mark_draft_sent(
    db: &Database,
    id: DraftId,
    sent: &SentEmail,
) -> Result<Option<Draft>, PressdeskError> {
    let outbound_id = sent.outbound_message_id.clone();
    let thread_id = sent.thread_id.clone();
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<Option<Draft>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE drafts SET status = 'sent', outbound_message_id = ?1,
                     outbound_thread_id = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = 'approved'",
                params![outbound_id, thread_id, now, id.0],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO deliveries (draft_id, state, attempts, outbound_message_id,
                     thread_id, updated_at)
                 VALUES (?1, 'confirmed', 1, ?2, ?3, ?4)
                 ON CONFLICT(draft_id) DO UPDATE SET state = 'confirmed',
                     outbound_message_id = excluded.outbound_message_id,
                     thread_id = excluded.thread_id, last_error = NULL,
                     updated_at = excluded.updated_at",
                params![id.0, outbound_id, thread_id, now],
            )?;
            tx.execute(
                "UPDATE requests SET status = 'closed', updated_at = ?1
                 WHERE id = (SELECT request_id FROM drafts WHERE id = ?2)",
                params![now, id.0],
            )?;
            let draft = select_draft(&tx, id.0)?;
            tx.commit()?;
            Ok(Some(draft))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_active_drafts(db: &Database, request_id: &RequestId) -> Result<u64, PressdeskError> {
    let rid = request_id.0.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM drafts WHERE request_id = ?1 AND status IN ({ACTIVE_STATUSES})"
                ),
                params![rid],
                |row| row.get(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}
