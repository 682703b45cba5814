//! Database schema migrations.
//!
//! Applied versions are recorded in `_migrations`. Each step runs in its own
//! transaction together with its version row, so a crash mid-upgrade leaves
//! the schema at the previous version.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered schema steps: (version, SQL).
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_namespaces.sql")),
    (2, include_str!("../../migrations/002_entries.sql")),
    (3, include_str!("../../migrations/003_namespace_installed.sql")),
];

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] naming the step that could not be applied.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let failed = |e: tokio_rusqlite::rusqlite::Error| Error::MigrationFailed(format!("v{version}: {e}"));

            let tx = conn.transaction().map_err(failed)?;
            tx.execute_batch(sql).map_err(failed)?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(failed)?;
            tx.commit().map_err(failed)?;

            tracing::debug!(version, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
