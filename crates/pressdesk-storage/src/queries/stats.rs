// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate counts for operator reporting.

use std::str::FromStr;

use pressdesk_core::PressdeskError;
use pressdesk_core::types::{DraftStatus, RequestStatus, StatusCounts};

use crate::database::{Database, map_tr_err};

fn grouped(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status"
    ))?;
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect()
}

/// Number of requests and drafts in each status. Statuses with no rows are omitted.
pub async fn status_counts(db: &Database) -> Result<StatusCounts, PressdeskError> {
    let (requests, drafts) = db
        .connection()
        .call(|conn| -> Result<_, rusqlite::Error> {
            Ok((grouped(conn, "requests")?, grouped(conn, "drafts")?))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(StatusCounts {
        requests: requests
            .into_iter()
            .filter_map(|(s, n)| Some((RequestStatus::from_str(&s).ok()?, n.max(0) as u64)))
            .collect(),
        drafts: drafts
            .into_iter()
            .filter_map(|(s, n)| Some((DraftStatus::from_str(&s).ok()?, n.max(0) as u64)))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::drafts::insert_draft;
    use crate::queries::requests::insert_request_if_absent;
    use crate::queries::test_support::{raw, setup_db};
    use pressdesk_core::types::RequestId;

    #[tokio::test]
    async fn counts_group_by_status() {
        let (db, _dir) = setup_db().await;
        for id in ["a", "b", "c"] {
            insert_request_if_absent(&db, &raw(id)).await.unwrap();
        }
        insert_draft(&db, &RequestId("a".into()), "s", "b").await.unwrap();

        let counts = status_counts(&db).await.unwrap();
        assert!(counts.requests.contains(&(RequestStatus::New, 2)));
        assert!(counts.requests.contains(&(RequestStatus::Drafted, 1)));
        assert_eq!(counts.drafts, vec![(DraftStatus::PendingReview, 1)]);
        db.close().await.unwrap();
    }
}
