//! OpenAPI documentation, served at `/api/openapi.json` and browsable under `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use epubfix_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EpubFix API",
        version = "0.1.0",
        description = "Upload EPUB files, convert EPUB 2 to EPUB 3 and apply accessibility fixes with the epub-fix tool. Fixed files and HTML reports are downloaded through /api/epub/download."
    ),
    paths(
        // Auth
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::session,
        handlers::auth::logout,
        // EPUB
        handlers::epub_process::process_epub,
        handlers::epub_list::list_epubs,
        handlers::epub_download::download_file,
        handlers::epub_delete::delete_epub,
        // Admin
        handlers::admin::list_users,
        handlers::admin::list_epubs,
    ),
    components(
        schemas(
            models::UploadRecordResponse,
            models::UploadStatus,
            models::UserResponse,
            models::UserSummary,
            handlers::auth::SignupRequest,
            handlers::auth::LoginRequest,
            handlers::auth::LoginResponse,
            handlers::auth::LogoutResponse,
            handlers::epub_process::ProcessResponse,
            handlers::epub_process::ProcessedFiles,
            handlers::epub_list::UploadListResponse,
            handlers::epub_delete::DeleteResponse,
            handlers::admin::AdminUsersResponse,
            handlers::admin::AdminUploadsResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Account and session endpoints"),
        (name = "epub", description = "Upload, list, download and delete EPUBs"),
        (name = "admin", description = "Administrator listings")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
