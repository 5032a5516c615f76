use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use epubfix_core::constants::{PROCESSED_DIR, UPLOADS_DIR};
use epubfix_core::naming::staged_file_name;

use crate::error::{StorageError, StorageResult};
use crate::keys::{content_type_for, url_for_key, validate_key};

/// A freshly written upload.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Key relative to the work directory, e.g. `uploads/<file_id>-book.epub`.
    pub key: String,
    pub path: PathBuf,
    pub url: String,
}

/// A validated, existing file ready to be served.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
    pub size: u64,
}

impl ResolvedFile {
    pub fn is_html(&self) -> bool {
        self.content_type == epubfix_core::constants::HTML_MIME_TYPE
    }
}

/// Local work directory holding `uploads/` and `processed/`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the work directory layout if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        for dir in [root.join(UPLOADS_DIR), root.join(PROCESSED_DIR)] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        // Canonical root keeps the containment check below meaningful for relative roots.
        let root = root.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize work dir: {}", e))
        })?;

        Ok(Workspace { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn processed_dir_key(file_id: &str) -> String {
        format!("{}/{}", PROCESSED_DIR, file_id)
    }

    pub fn uploads_key(file_name: &str) -> String {
        format!("{}/{}", UPLOADS_DIR, file_name)
    }

    /// Key of `path` relative to the work directory, if it lives inside it.
    pub fn key_for_path(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root)
            .ok()
            .and_then(|p| p.to_str())
            .map(|p| p.replace('\\', "/"))
    }

    /// Convert a key to a filesystem path with security validation.
    pub fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        let (_, relative) = validate_key(key)?;
        let path = self.root.join(relative);

        // Catches symlinks pointing out of the work directory.
        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&self.root).is_err() {
                return Err(StorageError::InvalidKey(
                    "Path resolves outside the work directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_path(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.ensure_parent_dir(path).await?;

        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Write uploaded bytes to `uploads/<file_id>-<file_name>`.
    pub async fn stage_upload(
        &self,
        file_id: &str,
        file_name: &str,
        data: &[u8],
    ) -> StorageResult<StagedFile> {
        let key = Self::uploads_key(&staged_file_name(file_id, file_name));
        let path = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        self.write_path(&path, data).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload staged"
        );

        Ok(StagedFile {
            url: url_for_key(&key),
            key,
            path,
        })
    }

    /// Write `data` under `key`, replacing any existing file.
    pub async fn write(&self, key: &str, data: &[u8]) -> StorageResult<PathBuf> {
        let path = self.key_to_path(key)?;
        self.write_path(&path, data).await?;
        Ok(path)
    }

    /// Move `from` (any path inside the work directory) to `to_key`.
    ///
    /// Falls back to copy + remove when a rename is not possible.
    pub async fn relocate(&self, from: &Path, to_key: &str) -> StorageResult<PathBuf> {
        let to_path = self.key_to_path(to_key)?;

        if self.key_for_path(from).is_none() {
            return Err(StorageError::InvalidKey(format!(
                "{} is outside the work directory",
                from.display()
            )));
        }
        if from == to_path {
            return Ok(to_path);
        }

        self.ensure_parent_dir(&to_path).await?;

        if let Err(rename_err) = fs::rename(from, &to_path).await {
            tracing::debug!(
                error = %rename_err,
                from = %from.display(),
                to = %to_path.display(),
                "Rename failed, falling back to copy"
            );
            fs::copy(from, &to_path).await.map_err(|e| {
                StorageError::MoveFailed(format!(
                    "Failed to copy {} to {}: {}",
                    from.display(),
                    to_path.display(),
                    e
                ))
            })?;
            if let Err(e) = fs::remove_file(from).await {
                tracing::warn!(error = %e, path = %from.display(), "Failed to remove moved source file");
            }
        }

        tracing::debug!(from = %from.display(), to = %to_path.display(), "File relocated");

        Ok(to_path)
    }

    /// Remove the file at `path`; a missing file is not an error.
    pub async fn remove_path(&self, path: &Path) -> StorageResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a stored artifact by its URL or key.
    ///
    /// Never fails; problems are logged. Returns whether a file was removed.
    pub async fn remove_best_effort(&self, url_or_key: &str) -> bool {
        let key = url_or_key.trim_start_matches('/');
        let path = match self.key_to_path(key) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Refusing to remove invalid path");
                return false;
            }
        };

        match self.remove_path(&path).await {
            Ok(removed) => {
                if removed {
                    tracing::debug!(path = %path.display(), "File removed");
                }
                removed
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove file");
                false
            }
        }
    }

    /// Remove `processed/<file_id>` if it exists and is empty.
    pub async fn remove_processed_dir_if_empty(&self, file_id: &str) -> bool {
        let dir = self.root.join(PROCESSED_DIR).join(file_id);
        if file_id.is_empty() || file_id.contains(['/', '\\']) || file_id.contains("..") {
            return false;
        }

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return false,
        };
        match entries.next_entry().await {
            Ok(None) => match fs::remove_dir(&dir).await {
                Ok(()) => {
                    tracing::debug!(path = %dir.display(), "Removed empty output directory");
                    true
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "Failed to remove output directory");
                    false
                }
            },
            _ => false,
        }
    }

    /// Validate `requested` and confirm it names an existing regular file.
    ///
    /// Validation happens before any filesystem access.
    pub async fn resolve(&self, requested: &str) -> StorageResult<ResolvedFile> {
        let path = self.key_to_path(requested)?;

        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            _ => return Err(StorageError::NotFound(requested.to_string())),
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
            .to_string();

        Ok(ResolvedFile {
            content_type: content_type_for(&path),
            size: meta.len(),
            file_name,
            path,
        })
    }

    pub async fn read_to_string(&self, file: &ResolvedFile) -> StorageResult<String> {
        fs::read_to_string(&file.path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", file.path.display(), e))
        })
    }

    pub async fn read_stream(
        &self,
        file: &ResolvedFile,
    ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>> {
        let handle = fs::File::open(&file.path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to open file {}: {}", file.path.display(), e))
        })?;

        let path_display = file.path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(handle).map(move |result| {
            result.map_err(|e| {
                tracing::error!(path = %path_display, error = %e, "Stream read error");
                StorageError::ReadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_stage_and_resolve() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();

        let staged = ws
            .stage_upload("1700000000000-abcdefghi", "book.epub", b"PK\x03\x04")
            .await
            .unwrap();
        assert_eq!(staged.key, "uploads/1700000000000-abcdefghi-book.epub");
        assert_eq!(staged.url, "/uploads/1700000000000-abcdefghi-book.epub");

        let resolved = ws.resolve(&staged.key).await.unwrap();
        assert_eq!(resolved.content_type, "application/epub+zip");
        assert_eq!(resolved.size, 4);
        assert!(!resolved.is_html());
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal_before_reading() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();

        let result = ws.resolve("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = ws.resolve("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_resolve_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();

        let result = ws.resolve("processed/1-x/fixed-book.epub").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_relocate_creates_target_dir() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();
        let source = ws.write("uploads/book_fixed.epub", b"fixed").await.unwrap();

        let target = ws
            .relocate(&source, "processed/1-x/fixed-book.epub")
            .await
            .unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"fixed");
    }

    #[tokio::test]
    async fn test_relocate_rejects_sources_outside_workspace() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();
        let source = outside.path().join("book_fixed.epub");
        std::fs::write(&source, b"x").unwrap();

        let result = ws.relocate(&source, "processed/1-x/fixed-book.epub").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_remove_best_effort_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();
        ws.write("processed/1-x/fixed-book.epub", b"x").await.unwrap();

        assert!(ws.remove_best_effort("/processed/1-x/fixed-book.epub").await);
        assert!(!ws.remove_best_effort("/processed/1-x/fixed-book.epub").await);
        assert!(!ws.remove_best_effort("/../outside.txt").await);
        assert!(ws.remove_processed_dir_if_empty("1-x").await);
        assert!(!dir.path().join("processed/1-x").exists());
    }

    #[tokio::test]
    async fn test_remove_processed_dir_keeps_non_empty() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path()).await.unwrap();
        ws.write("processed/1-x/other.txt", b"x").await.unwrap();

        assert!(!ws.remove_processed_dir_if_empty("1-x").await);
        assert!(!ws.remove_processed_dir_if_empty("../uploads").await);
        assert!(dir.path().join("processed/1-x").exists());
    }
}
