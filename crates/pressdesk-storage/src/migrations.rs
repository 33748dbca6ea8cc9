// SPDX-FileCopyrightText: 2026 Pressdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied
//! on every open; refinery records what ran in `refinery_schema_history`.

use pressdesk_core::PressdeskError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply all pending migrations on a synchronous connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), PressdeskError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(PressdeskError::storage)?;
    for migration in report.applied_migrations() {
        tracing::info!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}
