use axum::{
    extract::{Query, State},
    Json,
};
use epubfix_core::AppError;
use epubfix_storage::{key_from_url, Workspace};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::EpubState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteQuery {
    /// Upload record id
    pub id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// `processed/<file_id>/fixed-book.epub` -> `<file_id>`
fn processed_dir_of(url: &str) -> Option<&str> {
    let key = key_from_url(url);
    let rest = key.strip_prefix(epubfix_core::constants::PROCESSED_DIR)?.strip_prefix('/')?;
    rest.split_once('/').map(|(file_id, _)| file_id)
}

async fn remove_artifacts(workspace: &Workspace, urls: &[&str]) -> usize {
    let mut removed = 0;
    for url in urls {
        if workspace.remove_best_effort(url).await {
            removed += 1;
        }
    }

    let mut dirs: Vec<&str> = urls.iter().filter_map(|u| processed_dir_of(u)).collect();
    dirs.dedup();
    for file_id in dirs {
        workspace.remove_processed_dir_if_empty(file_id).await;
    }

    removed
}

#[utoipa::path(
    delete,
    path = "/api/epub/delete",
    tag = "epub",
    params(DeleteQuery),
    responses(
        (status = 200, description = "Upload and its files deleted", body = DeleteResponse),
        (status = 400, description = "Missing or invalid id", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "Not found or owned by someone else", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %user.user_id, upload_id = ?query.id, operation = "delete_epub"))]
pub async fn delete_epub(
    State(state): State<EpubState>,
    user: AuthUser,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, HttpAppError> {
    let raw_id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("EPUB id is required".to_string()))?;
    let id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::BadRequest("Invalid EPUB id".to_string()))?;

    let not_found = || AppError::NotFound("EPUB not found or unauthorized".to_string());

    let record = state
        .uploads
        .get_for_owner(user.user_id, id)
        .await?
        .ok_or_else(not_found)?;

    let removed = remove_artifacts(&state.workspace, &record.artifact_urls()).await;

    if !state.uploads.delete_for_owner(user.user_id, id).await? {
        return Err(not_found().into());
    }

    tracing::info!(upload_id = %id, files_removed = removed, "Upload deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "EPUB deleted successfully".to_string(),
    }))
}
