//! Upload policy: size ceiling and extension allow-list.
//!
//! Enforced before any byte is sealed. The derived [`FileKind`]
//! classification is advisory metadata and never gates access; only the
//! allow-list does.

use custos_core::blob::extension;

use crate::error::{Result, VaultError};

/// Default upload ceiling: 50 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "jpg", "jpeg", "png", "gif", "xls", "xlsx", "txt",
];

/// Validate an upload against the policy.
pub fn check_upload(file_name: &str, size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(VaultError::TooLarge { size, limit });
    }

    match extension(file_name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(VaultError::UnsupportedType(file_name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions_pass() {
        for name in [
            "report.pdf",
            "notes.DOC",
            "scan.jpeg",
            "photo.PNG",
            "sheet.xlsx",
            "plain.txt",
        ] {
            assert!(check_upload(name, 1024, MAX_UPLOAD_BYTES).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_disallowed_extensions_fail() {
        for name in ["malware.exe", "archive.zip", "script.sh", "noextension", "dotfile."] {
            assert!(matches!(
                check_upload(name, 1024, MAX_UPLOAD_BYTES),
                Err(VaultError::UnsupportedType(_))
            ));
        }
    }

    #[test]
    fn test_size_ceiling() {
        assert!(check_upload("ok.pdf", MAX_UPLOAD_BYTES, MAX_UPLOAD_BYTES).is_ok());

        let err = check_upload("big.pdf", MAX_UPLOAD_BYTES + 1, MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(err, VaultError::TooLarge { .. }));
    }

    #[test]
    fn test_size_checked_before_extension() {
        // A 60 MiB .exe reports the size problem first; both would fail.
        let err = check_upload("huge.exe", 60 * 1024 * 1024, MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(err, VaultError::TooLarge { .. }));
    }
}
