//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use custos_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Get current version
    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    // Apply migrations
    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Disclosure requests and their lifecycle record
        CREATE TABLE grants (
            grant_id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_id INTEGER NOT NULL,
            requester_id TEXT NOT NULL,
            requester_name TEXT NOT NULL,
            requester_email TEXT NOT NULL,
            requester_org TEXT NOT NULL,
            requester_phone TEXT,
            reason TEXT NOT NULL,
            status TEXT NOT NULL,             -- pending/approved/rejected/downloaded
            validation_code TEXT,             -- present once approved
            expires_at INTEGER,               -- Unix ms, end of redemption window
            requested_at INTEGER NOT NULL,
            processed_at INTEGER,
            processed_by TEXT,
            downloaded_at INTEGER
        );

        -- A code authorizes exactly one grant, ever.
        CREATE UNIQUE INDEX idx_grants_code
            ON grants(validation_code) WHERE validation_code IS NOT NULL;

        -- At most one live pending request per (requester, resource);
        -- this is what makes submission a single conditional insert.
        CREATE UNIQUE INDEX idx_grants_pending
            ON grants(requester_id, resource_id) WHERE status = 'pending';

        CREATE INDEX idx_grants_resource ON grants(resource_id, requested_at);
        CREATE INDEX idx_grants_requester ON grants(requester_id, requested_at);
        CREATE INDEX idx_grants_status ON grants(status, requested_at);

        -- Encrypted file custody
        CREATE TABLE blobs (
            blob_id INTEGER PRIMARY KEY AUTOINCREMENT,
            resource_id INTEGER NOT NULL,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            plain_len INTEGER NOT NULL,
            nonce BLOB NOT NULL,              -- 12 bytes; all-zero in plaintext mode
            ciphertext BLOB NOT NULL,         -- plain_len + 16-byte tag when sealed
            kind TEXT NOT NULL,               -- advisory classification
            category TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX idx_blobs_resource ON blobs(resource_id, created_at);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        // Verify tables exist
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"grants".to_string()));
        assert!(tables.contains(&"blobs".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap(); // Should not error
        migrate(&mut conn).unwrap(); // Still should not error

        // Verify version is 1
        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_pending_index_is_partial() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO grants (resource_id, requester_id, requester_name, requester_email,
                                 requester_org, reason, status, requested_at)
             VALUES (1, 'alice', 'Alice', 'a@x', 'X', 'r', 'downloaded', 0)",
            [],
        )
        .unwrap();

        // A second non-pending row for the same pair is fine; only 'pending'
        // rows are constrained.
        conn.execute(
            "INSERT INTO grants (resource_id, requester_id, requester_name, requester_email,
                                 requester_org, reason, status, requested_at)
             VALUES (1, 'alice', 'Alice', 'a@x', 'X', 'r', 'pending', 1)",
            [],
        )
        .unwrap();

        let dup = conn.execute(
            "INSERT INTO grants (resource_id, requester_id, requester_name, requester_email,
                                 requester_org, reason, status, requested_at)
             VALUES (1, 'alice', 'Alice', 'a@x', 'X', 'r', 'pending', 2)",
            [],
        );
        assert!(dup.is_err());
    }
}
