use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
};
use epubfix_core::AppError;
use epubfix_processing::rewrite_report_links;
use futures::StreamExt;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::EpubState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DownloadQuery {
    /// Path relative to the work directory, e.g. `processed/<id>/fixed-book.epub`
    pub file: Option<String>,
}

/// `processed/<id>/report-book.html` -> `processed/<id>`
fn parent_key(key: &str) -> &str {
    key.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn content_disposition(kind: &str, file_name: &str) -> String {
    format!(
        "{}; filename=\"{}\"",
        kind,
        file_name.replace(['"', '\\'], "_")
    )
}

#[utoipa::path(
    get,
    path = "/api/epub/download",
    tag = "epub",
    params(DownloadQuery),
    responses(
        (status = 200, description = "File contents; HTML inline, everything else as attachment"),
        (status = 400, description = "Missing or rejected path", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, query), fields(user_id = %user.user_id, file = ?query.file, operation = "download"))]
pub async fn download_file(
    State(state): State<EpubState>,
    user: AuthUser,
    Query(query): Query<DownloadQuery>,
) -> Result<Response<Body>, HttpAppError> {
    let requested = query
        .file
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("File path is required".to_string()))?;

    let file = state.workspace.resolve(requested).await?;

    let builder = Response::builder().status(StatusCode::OK);

    let built = if file.is_html() {
        let html = state.workspace.read_to_string(&file).await?;
        let body = rewrite_report_links(&html, parent_key(requested));

        builder
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header(
                header::CONTENT_DISPOSITION,
                content_disposition("inline", &file.file_name),
            )
            .body(Body::from(body))
    } else {
        let stream = state.workspace.read_stream(&file).await?;
        let body_stream = stream.map(|result| {
            result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
        });

        builder
            .header(header::CONTENT_TYPE, file.content_type)
            .header(header::CONTENT_LENGTH, file.size)
            .header(
                header::CONTENT_DISPOSITION,
                content_disposition("attachment", &file.file_name),
            )
            .body(Body::from_stream(body_stream))
    };
    let response =
        built.map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    tracing::debug!(path = %file.path.display(), size_bytes = file.size, "Serving file");

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_key() {
        assert_eq!(parent_key("processed/1-abc/report-book.html"), "processed/1-abc");
        assert_eq!(parent_key("report.html"), "");
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        assert_eq!(
            content_disposition("attachment", "a\"b.epub"),
            "attachment; filename=\"a_b.epub\""
        );
    }
}
