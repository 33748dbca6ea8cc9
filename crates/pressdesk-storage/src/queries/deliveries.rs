// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery marker operations.
//!
//! The marker is written `in_flight` before every send attempt and moved to
//! `failed` when the attempt definitely failed. A marker still `in_flight`
//! after a restart means the outcome of a send is unknown.

use pressdesk_core::PressdeskError;
use pressdesk_core::clock;
use pressdesk_core::types::{DeliveryMarker, DraftId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{DELIVERY_COLUMNS, delivery_from_row};

pub async fn get_delivery(
    db: &Database,
    draft_id: DraftId,
) -> Result<Option<DeliveryMarker>, PressdeskError> {
    db.connection()
        .call(move |conn| -> Result<Option<DeliveryMarker>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE draft_id = ?1"),
                params![draft_id.0],
                delivery_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an attempt as started: state `in_flight`, attempts + 1.
pub async fn begin_delivery_attempt(
    db: &Database,
    draft_id: DraftId,
) -> Result<DeliveryMarker, PressdeskError> {
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<DeliveryMarker, rusqlite::Error> {
            conn.execute(
                "INSERT INTO deliveries (draft_id, state, attempts, updated_at)
                 VALUES (?1, 'in_flight', 1, ?2)
                 ON CONFLICT(draft_id) DO UPDATE SET
                     state = 'in_flight',
                     attempts = deliveries.attempts + 1,
                     updated_at = excluded.updated_at",
                params![draft_id.0, now],
            )?;
            conn.query_row(
                &format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE draft_id = ?1"),
                params![draft_id.0],
                delivery_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Record that the current attempt definitely failed.
pub async fn fail_delivery_attempt(
    db: &Database,
    draft_id: DraftId,
    error: &str,
) -> Result<(), PressdeskError> {
    let error = error.to_string();
    let now = clock::now();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE deliveries SET state = 'failed', last_error = ?1, updated_at = ?2
                 WHERE draft_id = ?3",
                params![error, now, draft_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Forget the marker, so the next approval starts counting attempts afresh.
pub async fn clear_delivery(db: &Database, draft_id: DraftId) -> Result<(), PressdeskError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM deliveries WHERE draft_id = ?1",
                params![draft_id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
