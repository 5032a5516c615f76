//! HTML report helpers.

use std::sync::LazyLock;

use epubfix_core::constants::DOWNLOAD_ROUTE;
use regex::{Captures, Regex};

/// Written when the fix step succeeded but produced no report.
pub fn placeholder_report() -> &'static str {
    "<html><body><h1>Processing Report</h1><p>No issues found or report generation failed.</p></body></html>"
}

static LINK_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src)(\s*=\s*)(["'])([^"']*)["']"#).expect("link pattern is valid")
});

fn is_relative_link(link: &str) -> bool {
    let lower = link.trim().to_ascii_lowercase();
    !(lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with('/')
        || lower.starts_with('?')
        || lower.contains("://")
        || lower.starts_with("data:")
        || lower.starts_with("mailto:")
        || lower.starts_with("javascript:"))
}

/// Point relative `href`/`src` links of a report stored in `report_dir`
/// (a work-dir relative key such as `processed/<file_id>`) back at the
/// download endpoint. Fragments are kept; absolute links are untouched.
pub fn rewrite_report_links(html: &str, report_dir: &str) -> String {
    let dir = report_dir.trim_matches('/');

    LINK_ATTR_RE
        .replace_all(html, |caps: &Captures| {
            let link = &caps[4];
            if !is_relative_link(link) {
                return caps[0].to_string();
            }

            let (target, fragment) = match link.split_once('#') {
                Some((target, fragment)) => (target, Some(fragment)),
                None => (link, None),
            };
            let target = target.trim_start_matches("./");
            let key = if dir.is_empty() {
                target.to_string()
            } else {
                format!("{}/{}", dir, target)
            };

            let mut rewritten = format!("{}?file={}", DOWNLOAD_ROUTE, urlencoding::encode(&key));
            if let Some(fragment) = fragment {
                rewritten.push('#');
                rewritten.push_str(fragment);
            }

            format!("{}{}{}{}{}", &caps[1], &caps[2], &caps[3], rewritten, &caps[3])
        })
        .into_owned()
}
