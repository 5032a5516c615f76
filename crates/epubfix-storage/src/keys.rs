//! Key generation and validation for the work directory layout.

use std::path::{Component, Path, PathBuf};

use epubfix_core::constants::{
    EPUB_MIME_TYPE, HTML_MIME_TYPE, OCTET_STREAM_MIME_TYPE, PROCESSED_DIR, UPLOADS_DIR,
};
use rand::Rng;

use crate::error::{StorageError, StorageResult};

const FILE_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The two directories keys may resolve into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRoot {
    Uploads,
    Processed,
}

impl ArtifactRoot {
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactRoot::Uploads => UPLOADS_DIR,
            ArtifactRoot::Processed => PROCESSED_DIR,
        }
    }

    fn from_component(name: &str) -> Option<Self> {
        match name {
            UPLOADS_DIR => Some(ArtifactRoot::Uploads),
            PROCESSED_DIR => Some(ArtifactRoot::Processed),
            _ => None,
        }
    }
}

/// Per-upload id: millisecond timestamp plus a random base36 suffix.
pub fn generate_file_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..FILE_ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Stored URL for a key: the key rooted at the work directory.
pub fn url_for_key(key: &str) -> String {
    format!("/{}", key.trim_start_matches('/'))
}

/// Inverse of [`url_for_key`].
pub fn key_from_url(url: &str) -> &str {
    url.trim_start_matches('/')
}

/// Content type derived from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("epub") => EPUB_MIME_TYPE,
        Some("html") | Some("htm") => HTML_MIME_TYPE,
        _ => OCTET_STREAM_MIME_TYPE,
    }
}

fn has_drive_prefix(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Validate a relative key purely lexically. Nothing on disk is touched.
///
/// Rejects parent-directory segments, absolute paths, drive or UNC prefixes,
/// backslashes, NUL bytes and anything outside `uploads/` or `processed/`.
pub fn validate_key(key: &str) -> StorageResult<(ArtifactRoot, PathBuf)> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Path is empty".to_string()));
    }
    if key.contains("..") {
        return Err(StorageError::InvalidKey(
            "Path contains parent directory traversal".to_string(),
        ));
    }
    if key.starts_with('/') || key.starts_with('\\') || has_drive_prefix(key) {
        return Err(StorageError::InvalidKey(
            "Absolute paths are not allowed".to_string(),
        ));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "Path contains invalid characters".to_string(),
        ));
    }

    let mut relative = PathBuf::new();
    let mut root = None;
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => {
                if root.is_none() {
                    let name = part.to_str().ok_or_else(|| {
                        StorageError::InvalidKey("Path is not valid UTF-8".to_string())
                    })?;
                    root = Some(ArtifactRoot::from_component(name).ok_or_else(|| {
                        StorageError::InvalidKey(format!(
                            "Path must start with {}/ or {}/",
                            UPLOADS_DIR, PROCESSED_DIR
                        ))
                    })?);
                }
                relative.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidKey(
                    "Path escapes the work directory".to_string(),
                ));
            }
        }
    }

    match root {
        // A bare root directory names no file.
        Some(root) if relative.components().count() > 1 => Ok((root, relative)),
        _ => Err(StorageError::InvalidKey(
            "Path does not name a file".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_file_id_shape() {
        let id = generate_file_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_file_id(), id);
    }

    #[test]
    fn test_validate_key_accepts_known_roots() {
        let (root, path) = validate_key("processed/1-abc/fixed-book.epub").unwrap();
        assert_eq!(root, ArtifactRoot::Processed);
        assert_eq!(path, PathBuf::from("processed/1-abc/fixed-book.epub"));

        let (root, _) = validate_key("./uploads/1-abc-book.epub").unwrap();
        assert_eq!(root, ArtifactRoot::Uploads);
    }

    #[test]
    fn test_validate_key_rejects_traversal_and_absolute() {
        for key in [
            "../etc/passwd",
            "processed/../../etc/passwd",
            "uploads/..",
            "/etc/passwd",
            "/uploads/1-book.epub",
            "\\\\server\\share\\x",
            "C:\\Windows\\win.ini",
            "c:/windows/win.ini",
            "uploads\\1-book.epub",
        ] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_validate_key_rejects_other_roots() {
        assert!(validate_key("src/main.rs").is_err());
        assert!(validate_key("uploads").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for(Path::new("a/fixed-b.EPUB")), "application/epub+zip");
        assert_eq!(content_type_for(Path::new("a/report-b.html")), "text/html");
        assert_eq!(content_type_for(Path::new("a/b.log")), "application/octet-stream");
    }

    #[test]
    fn test_url_roundtrip() {
        assert_eq!(url_for_key("uploads/1-a.epub"), "/uploads/1-a.epub");
        assert_eq!(key_from_url("/uploads/1-a.epub"), "uploads/1-a.epub");
    }
}
