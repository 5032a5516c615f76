use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::naming::download_link;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Completed,
    Failed,
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// EPUB package version as classified from the fixer tool's analysis output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EpubVersion {
    Epub2,
    Epub3,
}

impl EpubVersion {
    /// Only EPUB 2 packages go through the conversion step.
    pub fn needs_conversion(self) -> bool {
        matches!(self, EpubVersion::Epub2)
    }
}

impl Display for EpubVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            EpubVersion::Epub2 => write!(f, "epub2"),
            EpubVersion::Epub3 => write!(f, "epub3"),
        }
    }
}

/// One persisted upload attempt. Rows are written once when the attempt
/// concludes and are never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UploadRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: UploadStatus,
    pub original_url: String,
    pub epub3_url: Option<String>,
    pub fixed_url: Option<String>,
    pub log_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Every stored artifact path, original first.
    pub fn artifact_urls(&self) -> Vec<&str> {
        std::iter::once(self.original_url.as_str())
            .chain(self.epub3_url.as_deref())
            .chain(self.fixed_url.as_deref())
            .chain(self.log_url.as_deref())
            .collect()
    }
}

/// What is known about an upload once its bytes are staged
#[derive(Debug, Clone)]
pub struct UploadDescriptor {
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    /// Staged input path, e.g. `/uploads/<file_id>-book.epub`.
    pub original_url: String,
}

/// Artifact paths of a successful attempt
#[derive(Debug, Clone)]
pub struct ProcessedArtifacts {
    /// Present only when the input was converted from EPUB 2.
    pub epub3_url: Option<String>,
    pub fixed_url: String,
    pub log_url: Option<String>,
}

/// Row to insert. Built only through [`NewUploadRecord::completed`] and
/// [`NewUploadRecord::failed`], so derived URLs are never set on a failed attempt.
#[derive(Debug, Clone)]
pub struct NewUploadRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: UploadStatus,
    pub original_url: String,
    pub epub3_url: Option<String>,
    pub fixed_url: Option<String>,
    pub log_url: Option<String>,
}

impl NewUploadRecord {
    fn from_descriptor(descriptor: UploadDescriptor, status: UploadStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: descriptor.user_id,
            title: crate::naming::title_from_filename(&descriptor.file_name),
            file_name: descriptor.file_name,
            file_size: descriptor.file_size,
            file_type: descriptor.file_type,
            status,
            original_url: descriptor.original_url,
            epub3_url: None,
            fixed_url: None,
            log_url: None,
        }
    }

    pub fn completed(descriptor: UploadDescriptor, artifacts: ProcessedArtifacts) -> Self {
        let mut record = Self::from_descriptor(descriptor, UploadStatus::Completed);
        record.epub3_url = artifacts.epub3_url;
        record.fixed_url = Some(artifacts.fixed_url);
        record.log_url = artifacts.log_url;
        record
    }

    pub fn failed(descriptor: UploadDescriptor) -> Self {
        Self::from_descriptor(descriptor, UploadStatus::Failed)
    }

    /// Materialize the row as the store would return it.
    pub fn into_record(self, created_at: DateTime<Utc>) -> UploadRecord {
        UploadRecord {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            file_name: self.file_name,
            file_size: self.file_size,
            file_type: self.file_type,
            status: self.status,
            original_url: self.original_url,
            epub3_url: self.epub3_url,
            fixed_url: self.fixed_url,
            log_url: self.log_url,
            created_at,
        }
    }
}

/// Upload record as returned to clients, with ready-to-use download links
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadRecordResponse {
    pub id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub status: UploadStatus,
    pub original_url: String,
    pub epub3_url: Option<String>,
    pub fixed_url: Option<String>,
    pub log_url: Option<String>,
    pub original_download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epub3_download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_download_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UploadRecord> for UploadRecordResponse {
    fn from(record: UploadRecord) -> Self {
        UploadRecordResponse {
            original_download_url: download_link(&record.original_url),
            epub3_download_url: record.epub3_url.as_deref().map(download_link),
            fixed_download_url: record.fixed_url.as_deref().map(download_link),
            report_download_url: record.log_url.as_deref().map(download_link),
            id: record.id,
            title: record.title,
            file_name: record.file_name,
            file_size: record.file_size,
            file_type: record.file_type,
            status: record.status,
            original_url: record.original_url,
            epub3_url: record.epub3_url,
            fixed_url: record.fixed_url,
            log_url: record.log_url,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> UploadDescriptor {
        UploadDescriptor {
            user_id: Uuid::new_v4(),
            file_name: "book.epub".to_string(),
            file_size: 2048,
            file_type: "application/epub+zip".to_string(),
            original_url: "/uploads/1700000000000-abc123def-book.epub".to_string(),
        }
    }

    #[test]
    fn test_failed_record_has_no_derived_urls() {
        let record = NewUploadRecord::failed(descriptor());
        assert_eq!(record.status, UploadStatus::Failed);
        assert_eq!(record.title, "book");
        assert!(record.epub3_url.is_none());
        assert!(record.fixed_url.is_none());
        assert!(record.log_url.is_none());
        assert!(!record.original_url.is_empty());
    }

    #[test]
    fn test_completed_record_carries_artifacts() {
        let record = NewUploadRecord::completed(
            descriptor(),
            ProcessedArtifacts {
                epub3_url: None,
                fixed_url: "/processed/1/fixed-book.epub".to_string(),
                log_url: Some("/processed/1/report-book.html".to_string()),
            },
        );
        assert_eq!(record.status, UploadStatus::Completed);
        assert!(record.epub3_url.is_none());
        assert_eq!(record.fixed_url.as_deref(), Some("/processed/1/fixed-book.epub"));
    }

    #[test]
    fn test_response_builds_download_links() {
        let record = NewUploadRecord::completed(
            descriptor(),
            ProcessedArtifacts {
                epub3_url: Some("/uploads/1-book_epub3.epub".to_string()),
                fixed_url: "/processed/1/fixed-book_epub3.epub".to_string(),
                log_url: Some("/processed/1/report-book_epub3.html".to_string()),
            },
        )
        .into_record(Utc::now());

        assert_eq!(record.artifact_urls().len(), 4);

        let response = UploadRecordResponse::from(record);
        assert_eq!(
            response.fixed_download_url.as_deref(),
            Some("/api/epub/download?file=processed%2F1%2Ffixed-book_epub3.epub")
        );
        assert!(response.epub3_download_url.is_some());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&UploadStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert!(EpubVersion::Epub2.needs_conversion());
        assert!(!EpubVersion::Epub3.needs_conversion());
    }
}
