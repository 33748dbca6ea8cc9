// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request operations. The request id is the source message id, so the
//! primary key doubles as the ingestion idempotency key.

use pressdesk_core::PressdeskError;
use pressdesk_core::clock;
use pressdesk_core::types::{RawMessage, Request, RequestId, RequestStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{REQUEST_COLUMNS, request_from_row};

/// Insert a request in status `new` unless its id is already present.
///
/// Returns `None` when a row with the same id exists; the existing row is
/// left untouched.
pub async fn insert_request_if_absent(
    db: &Database,
    raw: &RawMessage,
) -> Result<Option<Request>, PressdeskError> {
    let raw = raw.clone();
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<Option<Request>, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO requests (id, mailbox_message_id, sender_name, sender_email,
                     reply_to, subject, deadline, requirements, body_text, thread_id,
                     message_id, received_at, provider, requester_name, summary, category,
                     media_outlet, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, 'new', ?18, ?18)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    raw.source_id,
                    raw.mailbox_message_id,
                    raw.sender_name,
                    raw.sender_email,
                    raw.reply_to,
                    raw.subject,
                    raw.deadline,
                    raw.requirements,
                    raw.body_text,
                    raw.thread_id,
                    raw.message_id,
                    raw.received_at,
                    raw.provider.to_string(),
                    raw.requester_name,
                    raw.summary,
                    raw.category,
                    raw.media_outlet,
                    now,
                ],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1"),
                params![raw.source_id],
                request_from_row,
            )
            .map(Some)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_request(db: &Database, id: &RequestId) -> Result<Option<Request>, PressdeskError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Request>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1"),
                params![id],
                request_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Requests in a given status, oldest first.
pub async fn list_requests_by_status(
    db: &Database,
    status: RequestStatus,
) -> Result<Vec<Request>, PressdeskError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Request>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = ?1
                 ORDER BY received_at ASC, id ASC"
            ))?;
            stmt.query_map(params![status], request_from_row)?.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_request_status(
    db: &Database,
    id: &RequestId,
    status: RequestStatus,
) -> Result<(), PressdeskError> {
    let key = id.0.clone();
    let status = status.to_string();
    let now = clock::now();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, now, key],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(PressdeskError::NotFound {
            entity: "request",
            id: id.0.clone(),
        });
    }
    Ok(())
}
