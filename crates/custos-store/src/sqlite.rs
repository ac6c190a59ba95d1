//! SQLite implementation of the store traits.
//!
//! This is the primary backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`. The connection sits
//! behind a mutex, so every operation - including the guarded transitions -
//! runs serialized: a transition's read-classify-update sequence can never
//! interleave with another caller's.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use custos_core::{
    AccessGrant, BlobId, EncryptedBlob, FileKind, GrantId, GrantStatus, NewBlob, NewGrant,
    RequesterProfile, ResourceId, ValidationCode, CODE_TTL_MS, NONCE_LEN,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{BlobStore, GrantStore, PendingInsert, Redemption, Transition};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

/// Column list shared by every grant SELECT.
const GRANT_COLUMNS: &str = "grant_id, resource_id, requester_id, requester_name, \
     requester_email, requester_org, requester_phone, reason, status, \
     validation_code, expires_at, requested_at, processed_at, processed_by, downloaded_at";

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessGrant> {
    let status_str: String = row.get("status")?;
    let status = GrantStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(8, "status".into(), rusqlite::types::Type::Text)
    })?;

    let code_str: Option<String> = row.get("validation_code")?;
    let validation_code = code_str
        .map(|s| {
            ValidationCode::parse(&s).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    9,
                    "validation_code".into(),
                    rusqlite::types::Type::Text,
                )
            })
        })
        .transpose()?;

    Ok(AccessGrant {
        id: GrantId(row.get("grant_id")?),
        resource_id: ResourceId(row.get("resource_id")?),
        requester_id: row.get("requester_id")?,
        requester: RequesterProfile {
            name: row.get("requester_name")?,
            email: row.get("requester_email")?,
            organization: row.get("requester_org")?,
            phone: row.get("requester_phone")?,
        },
        reason: row.get("reason")?,
        status,
        validation_code,
        expires_at: row.get("expires_at")?,
        requested_at: row.get("requested_at")?,
        processed_at: row.get("processed_at")?,
        processed_by: row.get("processed_by")?,
        downloaded_at: row.get("downloaded_at")?,
    })
}

fn row_to_blob(row: &rusqlite::Row<'_>) -> rusqlite::Result<EncryptedBlob> {
    let nonce_bytes: Vec<u8> = row.get("nonce")?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(5, "nonce".into(), rusqlite::types::Type::Blob)
    })?;

    let kind_str: String = row.get("kind")?;
    let kind = FileKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(7, "kind".into(), rusqlite::types::Type::Text)
    })?;

    Ok(EncryptedBlob {
        id: BlobId(row.get("blob_id")?),
        resource_id: ResourceId(row.get("resource_id")?),
        file_name: row.get("file_name")?,
        content_type: row.get("content_type")?,
        plain_len: row.get::<_, i64>("plain_len")? as u64,
        nonce,
        ciphertext: row.get("ciphertext")?,
        kind,
        category: row.get("category")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn get_grant_by_id(conn: &Connection, id: GrantId) -> Result<Option<AccessGrant>> {
    let sql = format!("SELECT {GRANT_COLUMNS} FROM grants WHERE grant_id = ?1");
    Ok(conn
        .query_row(&sql, params![id.as_i64()], row_to_grant)
        .optional()?)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn collect_grants(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<AccessGrant>> {
    let mut stmt = conn.prepare(sql)?;
    let grants = stmt
        .query_map(args, row_to_grant)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(grants)
}

#[async_trait]
impl GrantStore for SqliteStore {
    async fn insert_pending(&self, grant: NewGrant) -> Result<PendingInsert> {
        self.with_conn(move |conn| {
            // Single conditional insert against the partial unique index on
            // (requester_id, resource_id) WHERE status='pending'. The mutex
            // is held across insert and select, so the pair is atomic.
            let changed = conn.execute(
                "INSERT INTO grants (resource_id, requester_id, requester_name,
                                     requester_email, requester_org, requester_phone,
                                     reason, status, requested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)
                 ON CONFLICT(requester_id, resource_id) WHERE status = 'pending'
                 DO NOTHING",
                params![
                    grant.resource_id.as_i64(),
                    grant.requester_id,
                    grant.requester.name,
                    grant.requester.email,
                    grant.requester.organization,
                    grant.requester.phone,
                    grant.reason,
                    grant.requested_at,
                ],
            )?;

            if changed == 0 {
                let sql = format!(
                    "SELECT {GRANT_COLUMNS} FROM grants
                     WHERE requester_id = ?1 AND resource_id = ?2 AND status = 'pending'"
                );
                let existing = conn.query_row(
                    &sql,
                    params![grant.requester_id, grant.resource_id.as_i64()],
                    row_to_grant,
                )?;
                return Ok(PendingInsert::Existing(existing));
            }

            let id = GrantId(conn.last_insert_rowid());
            let created = get_grant_by_id(conn, id)?.ok_or_else(|| {
                StoreError::InvalidData("inserted grant vanished".to_string())
            })?;
            Ok(PendingInsert::Created(created))
        })
        .await
    }

    async fn get_grant(&self, id: GrantId) -> Result<Option<AccessGrant>> {
        self.with_conn(move |conn| get_grant_by_id(conn, id)).await
    }

    async fn find_by_code(&self, code: &ValidationCode) -> Result<Option<AccessGrant>> {
        let code = code.clone();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {GRANT_COLUMNS} FROM grants WHERE validation_code = ?1");
            Ok(conn
                .query_row(&sql, params![code.as_str()], row_to_grant)
                .optional()?)
        })
        .await
    }

    async fn mark_approved(
        &self,
        id: GrantId,
        approved_by: &str,
        code: &ValidationCode,
        now: i64,
    ) -> Result<Transition> {
        let approved_by = approved_by.to_string();
        let code = code.clone();
        self.with_conn(move |conn| {
            let expires_at = now + CODE_TTL_MS;
            let changed = conn
                .execute(
                    "UPDATE grants
                     SET status = 'approved', validation_code = ?2,
                         processed_by = ?3, processed_at = ?4, expires_at = ?5
                     WHERE grant_id = ?1 AND status = 'pending'",
                    params![id.as_i64(), code.as_str(), approved_by, now, expires_at],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::DuplicateCode
                    } else {
                        e.into()
                    }
                })?;

            if changed == 1 {
                let updated = get_grant_by_id(conn, id)?.ok_or_else(|| {
                    StoreError::InvalidData("approved grant vanished".to_string())
                })?;
                return Ok(Transition::Applied(updated));
            }

            match get_grant_by_id(conn, id)? {
                None => Ok(Transition::NotFound),
                Some(grant) => Ok(Transition::WrongState(grant.status)),
            }
        })
        .await
    }

    async fn mark_rejected(&self, id: GrantId, rejected_by: &str, now: i64) -> Result<Transition> {
        let rejected_by = rejected_by.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE grants
                 SET status = 'rejected', processed_by = ?2, processed_at = ?3
                 WHERE grant_id = ?1 AND status = 'pending'",
                params![id.as_i64(), rejected_by, now],
            )?;

            if changed == 1 {
                let updated = get_grant_by_id(conn, id)?.ok_or_else(|| {
                    StoreError::InvalidData("rejected grant vanished".to_string())
                })?;
                return Ok(Transition::Applied(updated));
            }

            match get_grant_by_id(conn, id)? {
                None => Ok(Transition::NotFound),
                Some(grant) => Ok(Transition::WrongState(grant.status)),
            }
        })
        .await
    }

    async fn redeem_code(&self, code: &ValidationCode, now: i64) -> Result<Redemption> {
        let code = code.clone();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {GRANT_COLUMNS} FROM grants WHERE validation_code = ?1");
            let Some(grant) = conn
                .query_row(&sql, params![code.as_str()], row_to_grant)
                .optional()?
            else {
                return Ok(Redemption::UnknownCode);
            };

            match grant.status {
                GrantStatus::Approved | GrantStatus::Downloaded => {
                    if grant.is_expired(now) {
                        return Ok(Redemption::Expired(grant));
                    }
                    if grant.status == GrantStatus::Downloaded {
                        return Ok(Redemption::Repeat(grant));
                    }

                    conn.execute(
                        "UPDATE grants SET status = 'downloaded', downloaded_at = ?2
                         WHERE grant_id = ?1 AND status = 'approved'",
                        params![grant.id.as_i64(), now],
                    )?;
                    let updated = get_grant_by_id(conn, grant.id)?.ok_or_else(|| {
                        StoreError::InvalidData("downloaded grant vanished".to_string())
                    })?;
                    Ok(Redemption::Downloaded(updated))
                }
                status => Ok(Redemption::WrongState(status)),
            }
        })
        .await
    }

    async fn list_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {GRANT_COLUMNS} FROM grants WHERE resource_id = ?1
                 ORDER BY requested_at DESC, grant_id DESC"
            );
            collect_grants(conn, &sql, &[&resource_id.as_i64()])
        })
        .await
    }

    async fn list_by_requester(&self, requester_id: &str) -> Result<Vec<AccessGrant>> {
        let requester_id = requester_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {GRANT_COLUMNS} FROM grants WHERE requester_id = ?1
                 ORDER BY requested_at DESC, grant_id DESC"
            );
            collect_grants(conn, &sql, &[&requester_id])
        })
        .await
    }

    async fn list_pending(&self) -> Result<Vec<AccessGrant>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {GRANT_COLUMNS} FROM grants WHERE status = 'pending'
                 ORDER BY requested_at DESC, grant_id DESC"
            );
            collect_grants(conn, &sql, &[])
        })
        .await
    }

    async fn list_recent(&self, since: i64) -> Result<Vec<AccessGrant>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {GRANT_COLUMNS} FROM grants WHERE requested_at >= ?1
                 ORDER BY requested_at DESC, grant_id DESC"
            );
            collect_grants(conn, &sql, &[&since])
        })
        .await
    }

    async fn list_stale_pending(&self, older_than: i64) -> Result<Vec<AccessGrant>> {
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {GRANT_COLUMNS} FROM grants
                 WHERE status = 'pending' AND requested_at <= ?1
                 ORDER BY requested_at DESC, grant_id DESC"
            );
            collect_grants(conn, &sql, &[&older_than])
        })
        .await
    }

    async fn count_pending(&self) -> Result<u64> {
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM grants WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn insert_blob(&self, blob: NewBlob) -> Result<EncryptedBlob> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO blobs (resource_id, file_name, content_type, plain_len,
                                    nonce, ciphertext, kind, category, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    blob.resource_id.as_i64(),
                    blob.file_name,
                    blob.content_type,
                    blob.plain_len as i64,
                    blob.nonce.as_slice(),
                    blob.ciphertext,
                    blob.kind.as_str(),
                    blob.category,
                    blob.created_at,
                ],
            )?;

            let id = BlobId(conn.last_insert_rowid());
            conn.query_row(
                "SELECT blob_id, resource_id, file_name, content_type, plain_len,
                        nonce, ciphertext, kind, category, created_at, updated_at
                 FROM blobs WHERE blob_id = ?1",
                params![id.as_i64()],
                row_to_blob,
            )
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_blob(&self, id: BlobId) -> Result<Option<EncryptedBlob>> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT blob_id, resource_id, file_name, content_type, plain_len,
                            nonce, ciphertext, kind, category, created_at, updated_at
                     FROM blobs WHERE blob_id = ?1",
                    params![id.as_i64()],
                    row_to_blob,
                )
                .optional()?)
        })
        .await
    }

    async fn list_blobs(&self, resource_id: ResourceId) -> Result<Vec<EncryptedBlob>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT blob_id, resource_id, file_name, content_type, plain_len,
                        nonce, ciphertext, kind, category, created_at, updated_at
                 FROM blobs WHERE resource_id = ?1
                 ORDER BY created_at DESC, blob_id DESC",
            )?;
            let blobs = stmt
                .query_map(params![resource_id.as_i64()], row_to_blob)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(blobs)
        })
        .await
    }

    async fn delete_blob(&self, id: BlobId) -> Result<bool> {
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM blobs WHERE blob_id = ?1", params![id.as_i64()])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn delete_blobs_for_resource(&self, resource_id: ResourceId) -> Result<u64> {
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "DELETE FROM blobs WHERE resource_id = ?1",
                params![resource_id.as_i64()],
            )?;
            Ok(changed as u64)
        })
        .await
    }
}
