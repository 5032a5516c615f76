//! Shared constants for paths, MIME types and tool output conventions.

/// Directory (relative to the work dir) holding staged uploads and EPUB3 conversions.
pub const UPLOADS_DIR: &str = "uploads";

/// Directory (relative to the work dir) holding one sub-directory of finalized artifacts per upload.
pub const PROCESSED_DIR: &str = "processed";

pub const EPUB_MIME_TYPE: &str = "application/epub+zip";
pub const HTML_MIME_TYPE: &str = "text/html";
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Suffix the fixer tool appends to a converted EPUB3 file stem.
pub const EPUB3_SUFFIX: &str = "_epub3.epub";
/// Suffix the fixer tool appends to a remediated EPUB file stem.
pub const FIXED_SUFFIX: &str = "_fixed.epub";
/// Suffix the fixer tool appends to an HTML report file stem.
pub const REPORT_SUFFIX: &str = "_report.html";

/// Prefix for finalized fixed EPUBs inside `processed/<file_id>/`.
pub const FIXED_PREFIX: &str = "fixed-";
/// Prefix for finalized reports inside `processed/<file_id>/`.
pub const REPORT_PREFIX: &str = "report-";

/// Route that serves artifacts; every download link is built from it.
pub const DOWNLOAD_ROUTE: &str = "/api/epub/download";

/// Name of the cookie carrying the session token.
pub const AUTH_COOKIE_NAME: &str = "auth-token";

/// Environment variable the fixer tool reads its AI key from.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
