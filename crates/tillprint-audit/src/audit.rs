// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of print job lifecycle events.
//
// Schema:
//   audit_log(
//     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp     TEXT    NOT NULL,   -- RFC 3339
//     action        TEXT    NOT NULL,   -- e.g. "print_completed", "queue_cleared"
//     job_id        TEXT,               -- absent for queue-wide actions
//     payload_hash  TEXT    NOT NULL,   -- SHA-256 hex digest, "" for queue-wide actions
//     success       INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details       TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tillprint_core::error::TillprintError;
use tillprint_core::types::JobId;
use tracing::{debug, instrument};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS audit_log (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp     TEXT    NOT NULL,
        action        TEXT    NOT NULL,
        job_id        TEXT,
        payload_hash  TEXT    NOT NULL,
        success       INTEGER NOT NULL,
        details       TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_audit_job ON audit_log(job_id);";

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into a `TillprintError::Database`.
fn db_err(e: rusqlite::Error) -> TillprintError {
    TillprintError::Database(e.to_string())
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub job_id: Option<String>,
    pub payload_hash: String,
    pub success: bool,
    pub details: Option<String>,
}

/// Append-only audit log backed by a SQLite database.
///
/// `rusqlite::Connection` is `Send` but not `Sync`; share it behind a mutex.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    ///
    /// The `audit_log` table is created automatically if it does not already
    /// exist.  WAL mode is enabled for better concurrent-read performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TillprintError> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, TillprintError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Record a new audit entry.
    ///
    /// `action` is a short snake_case verb (`"print_completed"`,
    /// `"print_failed"`, `"queue_cleared"`).  Queue-wide actions pass `None`
    /// for `job_id` and an empty `payload_hash`.
    #[instrument(skip(self, details), fields(%action, success))]
    pub fn record(
        &self,
        action: &str,
        job_id: Option<&JobId>,
        payload_hash: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<(), TillprintError> {
        let timestamp = Utc::now().to_rfc3339();
        let success_int: i32 = if success { 1 } else { 0 };
        let job_id = job_id.map(|id| id.to_string());

        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, action, job_id, payload_hash, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![timestamp, action, job_id, payload_hash, success_int, details],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// All entries for one job, oldest first.
    pub fn entries_for_job(&self, job_id: &JobId) -> Result<Vec<AuditEntry>, TillprintError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, job_id, payload_hash, success, details
                 FROM audit_log
                 WHERE job_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![job_id.to_string()], row_to_entry)
            .map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    /// Retrieve the most recent `limit` entries, ordered newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, TillprintError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, job_id, payload_hash, success, details
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt.query_map(params![limit], row_to_entry).map_err(db_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    /// Return the total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, TillprintError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        action: row.get(2)?,
        job_id: row.get(3)?,
        payload_hash: row.get(4)?,
        success: row.get::<_, i32>(5)? != 0,
        details: row.get(6)?,
    })
}
