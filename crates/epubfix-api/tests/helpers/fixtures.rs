use axum_test::multipart::{MultipartForm, Part};

/// Bytes that only need to look like an upload; the scripted tool never parses them.
pub fn epub_bytes() -> Vec<u8> {
    let mut data = b"PK\x03\x04".to_vec();
    data.extend_from_slice(b"mimetypeapplication/epub+zip");
    data
}

pub fn epub_form(file_name: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(epub_bytes())
            .file_name(file_name.to_string())
            .mime_type("application/epub+zip"),
    )
}
