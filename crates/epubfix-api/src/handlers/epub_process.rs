use axum::{
    extract::{Multipart, State},
    Json,
};
use epubfix_core::naming::{download_link, sanitize_filename};
use epubfix_core::AppError;
use epubfix_processing::{ProcessedUpload, UploadRequest};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::EpubState;
use crate::utils::upload::{extract_multipart_file, validate_file_extension, validate_file_size};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessedFiles {
    pub id: Uuid,
    pub original_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epub3_file_name: Option<String>,
    pub fixed_file_name: String,
    pub report_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epub3_file_url: Option<String>,
    pub fixed_file_url: String,
    /// Absent only when neither the tool's report nor the placeholder could be stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    pub data: ProcessedFiles,
}

impl From<ProcessedUpload> for ProcessResponse {
    fn from(processed: ProcessedUpload) -> Self {
        let message = processed.message().to_string();
        let record = processed.record;

        ProcessResponse {
            success: true,
            message,
            data: ProcessedFiles {
                id: record.id,
                original_file_name: record.file_name,
                epub3_file_name: processed.epub3_file_name,
                fixed_file_name: processed.fixed_file_name,
                report_file_name: processed.report_file_name,
                epub3_file_url: record.epub3_url.as_deref().map(download_link),
                fixed_file_url: record
                    .fixed_url
                    .as_deref()
                    .map(download_link)
                    .unwrap_or_default(),
                report_file_url: record.log_url.as_deref().map(download_link),
            },
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/epub/process",
    tag = "epub",
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Single field `file` holding the EPUB"),
    responses(
        (status = 200, description = "EPUB processed", body = ProcessResponse),
        (status = 400, description = "No file or invalid file", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Tool too old, conversion or fix failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %user.user_id, operation = "process_epub"))]
pub async fn process_epub(
    State(state): State<EpubState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, HttpAppError> {
    let upload = extract_multipart_file(multipart).await?;

    validate_file_size(upload.data.len(), state.limits.max_file_size)?;
    let file_name = sanitize_filename(&upload.file_name);
    validate_file_extension(&file_name, &state.limits.allowed_extensions)?;

    tracing::info!(
        file_name = %file_name,
        size_bytes = upload.data.len(),
        "Processing EPUB upload"
    );

    let request = UploadRequest {
        user_id: user.user_id,
        file_name,
        content_type: upload.content_type,
        data: upload.data,
    };

    // Detached so a dropped request still records the attempt and cleans up.
    let orchestrator = state.orchestrator.clone();
    let processed = tokio::spawn(async move { orchestrator.process(request).await })
        .await
        .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))??;

    Ok(Json(ProcessResponse::from(processed)))
}
