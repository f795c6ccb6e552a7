//! SQLite-backed audit store.
//!
//! The store is private to the core: external tooling goes through
//! BatchCoordinator/AuditLog, never the tables, because the append-only
//! invariant is enforced here, not in SQL.
//!
//! Each insert runs in its own implicit write transaction, so a crash
//! mid-batch leaves a consistent prefix of recorded operations. Never
//! batch multiple files into one transaction.

use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::debug;

pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (creating if needed) the audit database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            // Best-effort: open() itself reports the real failure if this didn't help.
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        let log = AuditLog { conn };
        log.configure_pragmas()?;
        log.init_schema()?;
        Ok(log)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let log = AuditLog { conn };
        log.configure_pragmas()?;
        log.init_schema()?;
        Ok(log)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("audit store pragmas configured (WAL, foreign keys, 5s busy timeout)");
        Ok(())
    }

    /// Create tables on first open. The audit trail is the system of record,
    /// so migrations must never drop: additive changes only.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version < 1 {
            self.conn.execute_batch("PRAGMA user_version = 1;")?;
        }
        debug!("audit schema ready (version 1)");
        Ok(())
    }

    pub(super) fn connection(&self) -> &Connection {
        &self.conn
    }
}
