// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite rows and the domain types in `pressdesk-core`.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

pub use pressdesk_core::types::{
    ActionLogEntry, ActionLogRecord, DeliveryMarker, DeliveryState, Draft, DraftId, DraftStatus,
    NotificationId, NotificationRecord, PendingEdit, Provider, Request, RequestId, RequestStatus,
};

pub(crate) const REQUEST_COLUMNS: &str = "id, mailbox_message_id, sender_name, sender_email, \
     reply_to, subject, deadline, requirements, body_text, thread_id, message_id, received_at, \
     provider, requester_name, summary, category, media_outlet, status, created_at, updated_at";

pub(crate) const DRAFT_COLUMNS: &str = "id, request_id, version, subject, body, status, \
     outbound_message_id, outbound_thread_id, created_at, updated_at";

pub(crate) const DELIVERY_COLUMNS: &str =
    "draft_id, state, attempts, outbound_message_id, thread_id, last_error, updated_at";

/// Parse a TEXT column into a strum-backed enum.
fn enum_column<T: FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn request_from_row(row: &Row<'_>) -> rusqlite::Result<Request> {
    Ok(Request {
        id: RequestId(row.get(0)?),
        mailbox_message_id: row.get(1)?,
        sender_name: row.get(2)?,
        sender_email: row.get(3)?,
        reply_to: row.get(4)?,
        subject: row.get(5)?,
        deadline: row.get(6)?,
        requirements: row.get(7)?,
        body_text: row.get(8)?,
        thread_id: row.get(9)?,
        message_id: row.get(10)?,
        received_at: row.get(11)?,
        provider: enum_column(row, 12)?,
        requester_name: row.get(13)?,
        summary: row.get(14)?,
        category: row.get(15)?,
        media_outlet: row.get(16)?,
        status: enum_column(row, 17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

pub(crate) fn draft_from_row(row: &Row<'_>) -> rusqlite::Result<Draft> {
    Ok(Draft {
        id: DraftId(row.get(0)?),
        request_id: RequestId(row.get(1)?),
        version: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        status: enum_column(row, 5)?,
        outbound_message_id: row.get(6)?,
        outbound_thread_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub(crate) fn delivery_from_row(row: &Row<'_>) -> rusqlite::Result<DeliveryMarker> {
    Ok(DeliveryMarker {
        draft_id: DraftId(row.get(0)?),
        state: enum_column(row, 1)?,
        attempts: row.get(2)?,
        outbound_message_id: row.get(3)?,
        thread_id: row.get(4)?,
        last_error: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
