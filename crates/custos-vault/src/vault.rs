//! The file vault: upload policy, seal-on-write, open-on-read.
//!
//! Binds the cipher to blob persistence. When encryption is disabled by
//! configuration the vault stores bytes verbatim with a zero-filled nonce,
//! keeping one record shape either way; fetch mirrors the store-time toggle.

use std::sync::Arc;

use bytes::Bytes;
use custos_core::{BlobId, Clock, EncryptedBlob, FileKind, NewBlob, ResourceId};
use custos_store::BlobStore;

use crate::config::VaultConfig;
use crate::crypto::FileNonce;
use crate::error::{Result, VaultError};
use crate::policy;

/// A file as returned to a downloader: the original name and declared
/// content type (for response headers) plus the plaintext bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Encrypted file custody over a blob store.
pub struct FileVault<S> {
    store: Arc<S>,
    config: VaultConfig,
    clock: Arc<dyn Clock>,
}

impl<S: BlobStore> FileVault<S> {
    /// Create a vault over the given store.
    pub fn new(store: Arc<S>, config: VaultConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Validate, seal, and persist an uploaded file.
    ///
    /// Fails with `TooLarge` or `UnsupportedType` before touching the
    /// cipher. Returns the stored record (metadata plus sealed payload).
    pub async fn store(
        &self,
        resource_id: ResourceId,
        file_name: &str,
        content_type: &str,
        bytes: Bytes,
        category: Option<String>,
    ) -> Result<EncryptedBlob> {
        policy::check_upload(file_name, bytes.len() as u64, self.config.max_upload_bytes)?;

        let kind = FileKind::from_name(file_name);
        let (nonce, ciphertext) = if self.config.encrypt {
            let nonce = FileNonce::generate();
            let ciphertext = self.config.key.seal(&bytes, &nonce)?;
            (nonce, ciphertext)
        } else {
            (FileNonce::ZERO, bytes.to_vec())
        };

        let blob = self
            .store
            .insert_blob(NewBlob {
                resource_id,
                file_name: file_name.to_string(),
                content_type: content_type.to_string(),
                plain_len: bytes.len() as u64,
                nonce: *nonce.as_bytes(),
                ciphertext,
                kind,
                category,
                created_at: self.clock.now_millis(),
            })
            .await?;
        Ok(blob)
    }

    /// Fetch and open a stored file.
    pub async fn fetch(&self, id: BlobId) -> Result<FileContent> {
        let blob = self
            .store
            .get_blob(id)
            .await?
            .ok_or(VaultError::NotFound(id))?;

        let bytes = if self.config.encrypt {
            Bytes::from(self.config.key.open(
                &blob.ciphertext,
                &FileNonce::from_bytes(blob.nonce),
            )?)
        } else {
            Bytes::from(blob.ciphertext)
        };

        Ok(FileContent {
            file_name: blob.file_name,
            content_type: blob.content_type,
            bytes,
        })
    }

    /// All blob records attached to a resource, most recent first.
    pub async fn list(&self, resource_id: ResourceId) -> Result<Vec<EncryptedBlob>> {
        Ok(self.store.list_blobs(resource_id).await?)
    }

    /// The most recently stored blob for a resource, if any.
    pub async fn latest(&self, resource_id: ResourceId) -> Result<Option<EncryptedBlob>> {
        Ok(self.store.list_blobs(resource_id).await?.into_iter().next())
    }

    /// Hard-delete a stored file.
    pub async fn remove(&self, id: BlobId) -> Result<()> {
        if self.store.delete_blob(id).await? {
            Ok(())
        } else {
            Err(VaultError::NotFound(id))
        }
    }

    /// Hard-delete every file attached to a resource (cascade support).
    pub async fn remove_for_resource(&self, resource_id: ResourceId) -> Result<u64> {
        Ok(self.store.delete_blobs_for_resource(resource_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custos_core::{ManualClock, NONCE_LEN};
    use custos_store::MemoryStore;

    fn make_vault(config: VaultConfig) -> FileVault<MemoryStore> {
        FileVault::new(
            Arc::new(MemoryStore::new()),
            config,
            Arc::new(ManualClock::at(1_000)),
        )
    }

    #[tokio::test]
    async fn test_store_fetch_byte_identity() {
        let vault = make_vault(VaultConfig::for_tests());
        let payload = Bytes::from(vec![0x25u8; 10 * 1024]); // 10 KiB "pdf"

        let blob = vault
            .store(
                ResourceId(1),
                "expertise.pdf",
                "application/pdf",
                payload.clone(),
                Some("report".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(blob.kind, FileKind::Pdf);
        assert_eq!(blob.plain_len, payload.len() as u64);
        assert_eq!(blob.ciphertext.len(), payload.len() + crate::TAG_LEN);
        assert_ne!(blob.nonce, [0u8; NONCE_LEN]);

        let fetched = vault.fetch(blob.id).await.unwrap();
        assert_eq!(fetched.bytes, payload);
        assert_eq!(fetched.file_name, "expertise.pdf");
        assert_eq!(fetched.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_upload_policy_enforced() {
        let vault = make_vault(VaultConfig::for_tests());

        let too_large = vault
            .store(
                ResourceId(1),
                "big.pdf",
                "application/pdf",
                Bytes::from(vec![0u8; (60 * 1024 * 1024) as usize]),
                None,
            )
            .await;
        assert!(matches!(too_large, Err(VaultError::TooLarge { .. })));

        let bad_type = vault
            .store(
                ResourceId(1),
                "setup.exe",
                "application/octet-stream",
                Bytes::from_static(b"MZ"),
                None,
            )
            .await;
        assert!(matches!(bad_type, Err(VaultError::UnsupportedType(_))));
    }

    #[tokio::test]
    async fn test_plaintext_mode_keeps_schema_uniform() {
        let mut config = VaultConfig::for_tests();
        config.encrypt = false;
        let vault = make_vault(config);

        let blob = vault
            .store(
                ResourceId(1),
                "notes.txt",
                "text/plain",
                Bytes::from_static(b"clear text"),
                None,
            )
            .await
            .unwrap();

        // Zero nonce placeholder, verbatim bytes.
        assert_eq!(blob.nonce, [0u8; NONCE_LEN]);
        assert_eq!(blob.ciphertext, b"clear text");

        let fetched = vault.fetch(blob.id).await.unwrap();
        assert_eq!(fetched.bytes, Bytes::from_static(b"clear text"));
    }

    #[tokio::test]
    async fn test_fetch_missing_blob() {
        let vault = make_vault(VaultConfig::for_tests());
        assert!(matches!(
            vault.fetch(BlobId(404)).await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupted_ciphertext_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        let config = VaultConfig::for_tests();
        let vault = FileVault::new(Arc::clone(&store), config.clone(), Arc::new(ManualClock::at(0)));

        let blob = vault
            .store(
                ResourceId(1),
                "report.pdf",
                "application/pdf",
                Bytes::from_static(b"authentic bytes"),
                None,
            )
            .await
            .unwrap();

        // Corrupt the record in place by re-inserting a tampered copy.
        let mut tampered = store.get_blob(blob.id).await.unwrap().unwrap();
        tampered.ciphertext[0] ^= 0x01;
        let tampered = store
            .insert_blob(NewBlob {
                resource_id: tampered.resource_id,
                file_name: tampered.file_name,
                content_type: tampered.content_type,
                plain_len: tampered.plain_len,
                nonce: tampered.nonce,
                ciphertext: tampered.ciphertext,
                kind: tampered.kind,
                category: tampered.category,
                created_at: tampered.created_at,
            })
            .await
            .unwrap();

        assert!(matches!(
            vault.fetch(tampered.id).await,
            Err(VaultError::Authentication)
        ));
    }

    #[tokio::test]
    async fn test_latest_and_remove() {
        let vault = make_vault(VaultConfig::for_tests());

        let first = vault
            .store(ResourceId(7), "v1.pdf", "application/pdf", Bytes::from_static(b"v1"), None)
            .await
            .unwrap();
        let second = vault
            .store(ResourceId(7), "v2.pdf", "application/pdf", Bytes::from_static(b"v2"), None)
            .await
            .unwrap();

        // Same timestamp, higher id wins.
        let latest = vault.latest(ResourceId(7)).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);

        vault.remove(first.id).await.unwrap();
        assert!(matches!(
            vault.remove(first.id).await,
            Err(VaultError::NotFound(_))
        ));

        assert_eq!(vault.remove_for_resource(ResourceId(7)).await.unwrap(), 1);
        assert!(vault.latest(ResourceId(7)).await.unwrap().is_none());
    }
}
