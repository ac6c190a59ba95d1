//! Stored file metadata and payload.
//!
//! The blob record carries the sealed bytes together with the nonce used to
//! seal them. At this layer the nonce is opaque raw bytes; the vault crate
//! owns the cipher types and the encryption toggle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BlobId, ResourceId};

/// Nonce length in bytes (96-bit, per the AEAD in use).
pub const NONCE_LEN: usize = 12;

/// Advisory file classification derived from the filename extension.
///
/// Never gates access; it exists so listings can render an icon or filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Image,
    Document,
    Spreadsheet,
    Text,
    Other,
}

impl FileKind {
    /// Classify by extension, case-insensitively.
    pub fn from_name(file_name: &str) -> Self {
        match extension(file_name).as_deref() {
            Some("pdf") => FileKind::Pdf,
            Some("jpg") | Some("jpeg") | Some("png") | Some("gif") => FileKind::Image,
            Some("doc") | Some("docx") => FileKind::Document,
            Some("xls") | Some("xlsx") => FileKind::Spreadsheet,
            Some("txt") => FileKind::Text,
            _ => FileKind::Other,
        }
    }

    /// Stable string form used by the persistence layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
            FileKind::Document => "document",
            FileKind::Spreadsheet => "spreadsheet",
            FileKind::Text => "text",
            FileKind::Other => "other",
        }
    }

    /// Parse the persisted string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pdf" => Some(FileKind::Pdf),
            "image" => Some(FileKind::Image),
            "document" => Some(FileKind::Document),
            "spreadsheet" => Some(FileKind::Spreadsheet),
            "text" => Some(FileKind::Text),
            "other" => Some(FileKind::Other),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lowercased extension of a filename, if it has one.
pub fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// One stored file version, as held at rest.
///
/// `ciphertext` is the sealed payload (plaintext length + tag) when
/// encryption was enabled at store time, or the verbatim bytes with a
/// zero-filled nonce when it was not. The record shape is identical either
/// way; consumers must not infer the toggle from the nonce column.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub id: BlobId,
    /// The resource this file belongs to; deleted with it.
    pub resource_id: ResourceId,
    /// Original filename as uploaded.
    pub file_name: String,
    /// Declared content type, echoed back on download.
    pub content_type: String,
    /// Plaintext byte length.
    pub plain_len: u64,
    /// Nonce the payload was sealed under; all-zero in plaintext mode.
    pub nonce: [u8; NONCE_LEN],
    /// Sealed (or verbatim) payload.
    pub ciphertext: Vec<u8>,
    /// Advisory classification.
    pub kind: FileKind,
    /// Caller-supplied category tag.
    pub category: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

// Payloads can be tens of MiB; keep them out of debug output.
impl fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("id", &self.id)
            .field("resource_id", &self.resource_id)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("plain_len", &self.plain_len)
            .field("kind", &self.kind)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// A blob as submitted for insertion, before the store assigns an id.
#[derive(Clone)]
pub struct NewBlob {
    pub resource_id: ResourceId,
    pub file_name: String,
    pub content_type: String,
    pub plain_len: u64,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub kind: FileKind,
    pub category: Option<String>,
    pub created_at: i64,
}

impl NewBlob {
    /// Materialize the record the store will hold, with the assigned id.
    pub fn into_blob(self, id: BlobId) -> EncryptedBlob {
        EncryptedBlob {
            id,
            resource_id: self.resource_id,
            file_name: self.file_name,
            content_type: self.content_type,
            plain_len: self.plain_len,
            nonce: self.nonce,
            ciphertext: self.ciphertext,
            kind: self.kind,
            category: self.category,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_classification() {
        assert_eq!(FileKind::from_name("expertise.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_name("scan.JPEG"), FileKind::Image);
        assert_eq!(FileKind::from_name("notes.docx"), FileKind::Document);
        assert_eq!(FileKind::from_name("ledger.xls"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_name("readme.txt"), FileKind::Text);
        assert_eq!(FileKind::from_name("archive.zip"), FileKind::Other);
        assert_eq!(FileKind::from_name("no_extension"), FileKind::Other);
        assert_eq!(FileKind::from_name("trailing."), FileKind::Other);
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension("a.b.c.TXT").as_deref(), Some("txt"));
        assert_eq!(extension("none"), None);
    }

    #[test]
    fn test_kind_string_roundtrip() {
        for kind in [
            FileKind::Pdf,
            FileKind::Image,
            FileKind::Document,
            FileKind::Spreadsheet,
            FileKind::Text,
            FileKind::Other,
        ] {
            assert_eq!(FileKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_blob_debug_omits_payload() {
        let blob = NewBlob {
            resource_id: ResourceId(1),
            file_name: "secret.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            plain_len: 4,
            nonce: [7u8; NONCE_LEN],
            ciphertext: vec![0xde, 0xad, 0xbe, 0xef],
            kind: FileKind::Pdf,
            category: None,
            created_at: 0,
        }
        .into_blob(BlobId(1));

        let debug = format!("{:?}", blob);
        assert!(debug.contains("secret.pdf"));
        assert!(!debug.contains("222")); // 0xde as decimal
        assert!(debug.contains("ciphertext_len"));
    }
}
