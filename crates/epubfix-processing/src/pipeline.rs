//! Upload pipeline: stage → check tool → detect → convert → fix → finalize → persist.
//!
//! Every attempt that gets past request validation ends in exactly one
//! persisted [`UploadRecord`]: `completed` with its artifact URLs, or `failed`
//! with only the original URL. On failure the staged input and any partial
//! outputs are removed best-effort, without masking the original error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use epubfix_core::models::{NewUploadRecord, ProcessedArtifacts, UploadDescriptor};
use epubfix_core::naming::{
    epub3_file_name, fixed_file_name, parse_tool_version, report_file_name, staged_file_name,
    ToolVersion,
};
use epubfix_core::{AppError, EpubVersion, UploadRecord};
use epubfix_db::UploadStore;
use epubfix_storage::{generate_file_id, url_for_key, StorageError, Workspace};
use uuid::Uuid;

use crate::detection::detect_version;
use crate::locator::ArtifactLocator;
use crate::report::placeholder_report;
use crate::tool::FixerTool;

/// A validated upload ready to be processed
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: Uuid,
    /// Sanitized original filename.
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Result of a successful attempt
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    pub record: UploadRecord,
    pub file_id: String,
    pub version: EpubVersion,
    /// Present only for converted EPUB 2 inputs.
    pub epub3_file_name: Option<String>,
    pub fixed_file_name: String,
    pub report_file_name: String,
}

impl ProcessedUpload {
    pub fn message(&self) -> &'static str {
        match self.version {
            EpubVersion::Epub2 => "EPUB2 converted to EPUB3 and fixed successfully",
            EpubVersion::Epub3 => "EPUB3 fixed successfully",
        }
    }
}

/// Outputs of a finished attempt before persistence.
struct Outcome {
    version: EpubVersion,
    epub3_file_name: Option<String>,
    fixed_file_name: String,
    report_file_name: String,
    artifacts: ProcessedArtifacts,
}

/// Files created during an attempt, for cleanup on failure.
#[derive(Default)]
struct Produced {
    paths: Vec<PathBuf>,
}

impl Produced {
    fn push(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }
}

fn storage_error(context: &str, err: StorageError) -> AppError {
    AppError::from(anyhow::Error::new(err).context(context.to_string()))
}

pub struct UploadOrchestrator {
    workspace: Workspace,
    tool: Arc<dyn FixerTool>,
    locator: Arc<dyn ArtifactLocator>,
    uploads: Arc<dyn UploadStore>,
    min_version: ToolVersion,
}

impl UploadOrchestrator {
    pub fn new(
        workspace: Workspace,
        tool: Arc<dyn FixerTool>,
        locator: Arc<dyn ArtifactLocator>,
        uploads: Arc<dyn UploadStore>,
        min_version: &str,
    ) -> anyhow::Result<Self> {
        let min_version = parse_tool_version(min_version)
            .ok_or_else(|| anyhow::anyhow!("Invalid minimum tool version: {}", min_version))?;

        Ok(Self {
            workspace,
            tool,
            locator,
            uploads,
            min_version,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Process one upload end to end.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, file_name = %request.file_name, size_bytes = request.data.len()))]
    pub async fn process(&self, request: UploadRequest) -> Result<ProcessedUpload, AppError> {
        let file_id = generate_file_id();
        let staged_key = Workspace::uploads_key(&staged_file_name(&file_id, &request.file_name));

        let descriptor = UploadDescriptor {
            user_id: request.user_id,
            file_name: request.file_name.clone(),
            file_size: request.data.len() as i64,
            file_type: request.content_type.clone(),
            original_url: url_for_key(&staged_key),
        };

        let start = std::time::Instant::now();
        let mut produced = Produced::default();
        let result = self
            .run_attempt(&file_id, &request, &mut produced)
            .await;

        match result {
            Ok(outcome) => {
                let record = NewUploadRecord::completed(descriptor, outcome.artifacts);
                match self.uploads.create(record).await {
                    Ok(record) => {
                        tracing::info!(
                            upload_id = %record.id,
                            file_id = %file_id,
                            version = %outcome.version,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Upload processed"
                        );
                        Ok(ProcessedUpload {
                            record,
                            file_id,
                            version: outcome.version,
                            epub3_file_name: outcome.epub3_file_name,
                            fixed_file_name: outcome.fixed_file_name,
                            report_file_name: outcome.report_file_name,
                        })
                    }
                    Err(e) => {
                        tracing::error!(file_id = %file_id, error = %e, "Failed to persist completed upload");
                        self.cleanup(&file_id, &produced).await;
                        Err(e)
                    }
                }
            }
            Err(err) => {
                tracing::warn!(
                    file_id = %file_id,
                    error = %err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Upload processing failed"
                );
                self.cleanup(&file_id, &produced).await;
                if let Err(e) = self.uploads.create(NewUploadRecord::failed(descriptor)).await {
                    tracing::error!(file_id = %file_id, error = %e, "Failed to persist failed upload");
                }
                Err(err)
            }
        }
    }

    async fn run_attempt(
        &self,
        file_id: &str,
        request: &UploadRequest,
        produced: &mut Produced,
    ) -> Result<Outcome, AppError> {
        let staged = self
            .workspace
            .stage_upload(file_id, &request.file_name, &request.data)
            .await
            .map_err(|e| storage_error("Failed to stage upload", e))?;
        produced.push(staged.path.clone());

        self.ensure_tool_version().await?;

        let version = detect_version(self.tool.as_ref(), &staged.path).await;

        let (epub3_path, epub3_name, epub3_url) = if version.needs_conversion() {
            let (path, name, url) = self.convert(file_id, &request.file_name, &staged.path, produced).await?;
            (path, name, Some(url))
        } else {
            (staged.path.clone(), request.file_name.clone(), None)
        };

        let found = {
            if let Err(e) = self.tool.fix(&epub3_path).await {
                return Err(AppError::FixFailed(e.to_string()));
            }
            self.locator
                .locate_fix_outputs(&epub3_path, &produced.paths)
                .await
        };
        produced.paths.extend(found.fixed.iter().cloned());
        produced.paths.extend(found.report.iter().cloned());

        let fixed_source = found.fixed.ok_or_else(|| {
            AppError::FixFailed("Fixed EPUB file was not created".to_string())
        })?;

        let output_dir = Workspace::processed_dir_key(file_id);
        let fixed_name = fixed_file_name(&epub3_name);
        let report_name = report_file_name(&epub3_name);
        let fixed_key = format!("{}/{}", output_dir, fixed_name);
        let report_key = format!("{}/{}", output_dir, report_name);

        let fixed_path = self
            .workspace
            .relocate(&fixed_source, &fixed_key)
            .await
            .map_err(|e| storage_error("Failed to move fixed EPUB", e))?;
        produced.push(fixed_path);

        let log_url = match self.finalize_report(found.report.as_deref(), &report_key).await {
            Some(path) => {
                produced.push(path);
                Some(url_for_key(&report_key))
            }
            None => None,
        };

        Ok(Outcome {
            version,
            epub3_file_name: epub3_url.as_ref().map(|_| epub3_name.clone()),
            fixed_file_name: fixed_name,
            report_file_name: report_name,
            artifacts: ProcessedArtifacts {
                epub3_url,
                fixed_url: url_for_key(&fixed_key),
                log_url,
            },
        })
    }

    async fn ensure_tool_version(&self) -> Result<(), AppError> {
        let found = self.tool.version().await;
        if found < self.min_version {
            return Err(AppError::ExternalToolVersionTooLow {
                found: found.to_string(),
                required: self.min_version.to_string(),
            });
        }
        tracing::debug!(version = %found, "Using epub-fix");
        Ok(())
    }

    /// Convert the staged EPUB 2 input; returns the EPUB3 path, name and URL.
    async fn convert(
        &self,
        file_id: &str,
        file_name: &str,
        staged: &Path,
        produced: &mut Produced,
    ) -> Result<(PathBuf, String, String), AppError> {
        let epub3_name = epub3_file_name(file_name);
        let epub3_key = Workspace::uploads_key(&staged_file_name(file_id, &epub3_name));
        let expected = self
            .workspace
            .key_to_path(&epub3_key)
            .map_err(|e| storage_error("Invalid EPUB3 path", e))?;

        self.tool
            .convert(staged)
            .await
            .map_err(|e| AppError::ConversionFailed(e.to_string()))?;

        let found = self
            .locator
            .locate_converted(staged, &expected, &produced.paths)
            .await
            .ok_or_else(|| {
                AppError::ConversionFailed(
                    "EPUB3 output file was not created at the expected location".to_string(),
                )
            })?;
        produced.push(found.clone());

        if found != expected {
            tracing::info!(from = %found.display(), to = %expected.display(), "Moving converted EPUB3 into place");
            self.workspace
                .relocate(&found, &epub3_key)
                .await
                .map_err(|e| AppError::ConversionFailed(format!("Could not move EPUB3 output: {}", e)))?;
        }
        produced.push(expected.clone());

        Ok((expected, epub3_name, url_for_key(&epub3_key)))
    }

    /// Move the tool's report into place, or write the placeholder when there
    /// is none. `None` only if neither succeeded.
    async fn finalize_report(&self, found: Option<&Path>, report_key: &str) -> Option<PathBuf> {
        if let Some(source) = found {
            match self.workspace.relocate(source, report_key).await {
                Ok(path) => return Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to move report, writing placeholder instead")
                }
            }
        } else {
            tracing::warn!("Report file was not created by epub-fix, writing placeholder");
        }

        match self
            .workspace
            .write(report_key, placeholder_report().as_bytes())
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to write placeholder report");
                None
            }
        }
    }

    async fn cleanup(&self, file_id: &str, produced: &Produced) {
        for path in &produced.paths {
            if let Err(e) = self.workspace.remove_path(path).await {
                tracing::warn!(path = %path.display(), error = %e, "Error cleaning up file");
            }
        }
        self.workspace.remove_processed_dir_if_empty(file_id).await;
    }
}
