//! File naming conventions shared by staging, the fixer tool adapter and the
//! download links handed to clients.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{DOWNLOAD_ROUTE, EPUB3_SUFFIX, FIXED_PREFIX, REPORT_PREFIX};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)").expect("version pattern is valid"));

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^/.]+$").expect("extension pattern is valid"));

static EPUB_EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.epub$").expect("epub extension pattern is valid"));

/// `major.minor` version reported by `epub-fix --version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ToolVersion {
    /// Version assumed when the tool cannot report one.
    pub const UNKNOWN: ToolVersion = ToolVersion { major: 0, minor: 0 };
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Extract the first `major.minor` pair from free-form text.
pub fn parse_tool_version(text: &str) -> Option<ToolVersion> {
    let caps = VERSION_RE.captures(text)?;
    Some(ToolVersion {
        major: caps.get(1)?.as_str().parse().ok()?,
        minor: caps.get(2)?.as_str().parse().ok()?,
    })
}

/// Record title: the original filename without its last extension.
pub fn title_from_filename(filename: &str) -> String {
    let title = EXTENSION_RE.replace(filename, "");
    if title.is_empty() {
        filename.to_string()
    } else {
        title.into_owned()
    }
}

/// Filename without a trailing `.epub` (any case).
pub fn epub_stem(filename: &str) -> &str {
    match EPUB_EXTENSION_RE.find(filename) {
        Some(m) => &filename[..m.start()],
        None => filename,
    }
}

/// Name of the EPUB3 file the converter writes for `filename`.
pub fn epub3_file_name(filename: &str) -> String {
    format!("{}{}", epub_stem(filename), EPUB3_SUFFIX)
}

/// Normalized name of the fixed EPUB inside the per-upload output directory.
pub fn fixed_file_name(epub3_name: &str) -> String {
    format!("{}{}", FIXED_PREFIX, epub3_name)
}

/// Normalized name of the HTML report inside the per-upload output directory.
pub fn report_file_name(epub3_name: &str) -> String {
    format!("{}{}.html", REPORT_PREFIX, epub_stem(epub3_name))
}

/// Staged upload name: the file id keeps concurrent uploads of the same name apart.
pub fn staged_file_name(file_id: &str, filename: &str) -> String {
    format!("{}-{}", file_id, filename)
}

/// Link that serves `relative_path` through the download endpoint.
pub fn download_link(relative_path: &str) -> String {
    let relative = relative_path.trim_start_matches('/');
    format!("{}?file={}", DOWNLOAD_ROUTE, urlencoding::encode(relative))
}

/// Strip any directory components and replace characters that are unsafe in a path.
///
/// Runs of dots collapse to one so the name never contains `..`, and the result
/// is capped at [`MAX_FILENAME_BYTES`] with its extension kept.
pub fn sanitize_filename(filename: &str) -> String {
    const FALLBACK: &str = "upload.epub";

    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    if matches!(base, "" | "." | "..") {
        return FALLBACK.to_string();
    }

    let mut sanitized = String::with_capacity(base.len());
    for c in base.chars() {
        let c = if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '.' && sanitized.ends_with('.') {
            continue;
        }
        sanitized.push(c);
    }
    let sanitized = truncate_keeping_extension(&sanitized, MAX_FILENAME_BYTES);

    if sanitized.trim_matches(['_', '.']).is_empty() || sanitized.len() < 3 {
        FALLBACK.to_string()
    } else {
        sanitized
    }
}

/// Byte cap for sanitized names; leaves room for the file id prefix and
/// the longest derived suffix within a 255 byte file name.
pub const MAX_FILENAME_BYTES: usize = 180;

fn truncate_keeping_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if name.len() - dot < max_bytes => name.split_at(dot),
        _ => (name, ""),
    };
    let mut end = max_bytes - ext.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], ext)
}
