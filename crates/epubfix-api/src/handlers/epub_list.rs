use axum::{extract::State, Json};
use epubfix_core::models::UploadRecordResponse;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::EpubState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadListResponse {
    pub success: bool,
    pub data: Vec<UploadRecordResponse>,
}

#[utoipa::path(
    get,
    path = "/api/epub/list",
    tag = "epub",
    responses(
        (status = 200, description = "Caller's uploads, newest first", body = UploadListResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id, operation = "list_epubs"))]
pub async fn list_epubs(
    State(state): State<EpubState>,
    user: AuthUser,
) -> Result<Json<UploadListResponse>, HttpAppError> {
    let records = state.uploads.list_for_owner(user.user_id).await?;

    Ok(Json(UploadListResponse {
        success: true,
        data: records.into_iter().map(UploadRecordResponse::from).collect(),
    }))
}
