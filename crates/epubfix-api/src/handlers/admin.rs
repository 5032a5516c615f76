//! Read-only admin listings.

use std::sync::Arc;

use axum::{extract::State, Json};
use epubfix_core::models::{UploadRecordResponse, UserSummary};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AdminUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUsersResponse {
    pub success: bool,
    pub data: Vec<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUploadsResponse {
    pub success: bool,
    pub data: Vec<UploadRecordResponse>,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "All users with their upload counts", body = AdminUsersResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<AdminUsersResponse>, HttpAppError> {
    let users = state.auth.users.list_with_upload_counts().await?;
    tracing::debug!(admin_id = %admin.user_id, count = users.len(), "Admin listed users");

    Ok(Json(AdminUsersResponse {
        success: true,
        data: users,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/epubs",
    tag = "admin",
    responses(
        (status = 200, description = "All upload records, newest first", body = AdminUploadsResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_epubs(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<AdminUploadsResponse>, HttpAppError> {
    let records = state.epub.uploads.list_all().await?;
    tracing::debug!(admin_id = %admin.user_id, count = records.len(), "Admin listed uploads");

    Ok(Json(AdminUploadsResponse {
        success: true,
        data: records.into_iter().map(UploadRecordResponse::from).collect(),
    }))
}
