//! Discovery of files written by the fixer tool.
//!
//! The tool does not report where it wrote its outputs. [`ConventionLocator`]
//! probes the conventional names next to the input, then falls back to a
//! directory scan for the tool's known suffixes. A tool that reports explicit
//! output paths only needs a different [`ArtifactLocator`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use epubfix_core::constants::{EPUB3_SUFFIX, FIXED_SUFFIX, REPORT_SUFFIX};
use epubfix_core::naming::{epub3_file_name, epub_stem};
use epubfix_core::FixerToolConfig;

/// Outputs of the fix step. Only `fixed` is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixArtifacts {
    pub fixed: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

#[async_trait]
pub trait ArtifactLocator: Send + Sync {
    /// Find the EPUB3 produced by converting `input`. `expected` is where the
    /// pipeline wants it; the returned path may differ. Neither `input` nor
    /// any path in `owned` is ever returned.
    async fn locate_converted(
        &self,
        input: &Path,
        expected: &Path,
        owned: &[PathBuf],
    ) -> Option<PathBuf>;

    /// Find the fixed EPUB and report produced by fixing `input`, never
    /// returning `input` or a path in `owned`.
    async fn locate_fix_outputs(&self, input: &Path, owned: &[PathBuf]) -> FixArtifacts;
}

/// Probes by naming convention, retrying while the tool's writes settle.
#[derive(Debug, Clone)]
pub struct ConventionLocator {
    settle_delay: Duration,
    attempts: u32,
}

impl ConventionLocator {
    pub fn new(settle_delay: Duration, attempts: u32) -> Self {
        Self {
            settle_delay,
            attempts: attempts.max(1),
        }
    }

    pub fn from_config(config: &FixerToolConfig) -> Self {
        Self::new(config.artifact_settle_delay(), config.artifact_probe_attempts)
    }

    async fn settle(&self) {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Scan `dir` for a file ending in `suffix` whose base name is contained in
/// `input_name`. The longest matching base wins; `input` and `owned` files
/// are pipeline files, not tool outputs, and are skipped.
async fn scan_for_suffix(
    dir: &Path,
    suffix: &str,
    input_name: &str,
    input: &Path,
    owned: &[PathBuf],
) -> Option<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Cannot scan directory");
            return None;
        }
    };

    let mut best: Option<(usize, PathBuf)> = None;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(base) = name.strip_suffix(suffix) else {
            continue;
        };
        if base.is_empty() || !input_name.contains(base) {
            continue;
        }
        let path = entry.path();
        if path == input || owned.contains(&path) {
            continue;
        }
        if best.as_ref().map_or(true, |(len, _)| base.len() > *len) {
            best = Some((base.len(), path));
        }
    }

    best.map(|(_, path)| path)
}

async fn first_existing(candidates: &[PathBuf], input: &Path, owned: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        if candidate == input || owned.contains(candidate) {
            continue;
        }
        if is_file(candidate).await {
            return Some(candidate.clone());
        }
    }
    None
}

#[async_trait]
impl ArtifactLocator for ConventionLocator {
    #[tracing::instrument(skip(self))]
    async fn locate_converted(
        &self,
        input: &Path,
        expected: &Path,
        owned: &[PathBuf],
    ) -> Option<PathBuf> {
        let dir = input.parent().unwrap_or_else(|| Path::new("."));
        let input_name = file_name(input);
        let candidates = [expected.to_path_buf(), dir.join(epub3_file_name(input_name))];

        for attempt in 1..=self.attempts {
            self.settle().await;

            if let Some(found) = first_existing(&candidates, input, owned).await {
                tracing::debug!(path = %found.display(), attempt, "Found converted EPUB3");
                return Some(found);
            }
            if let Some(found) =
                scan_for_suffix(dir, EPUB3_SUFFIX, epub_stem(input_name), input, owned).await
            {
                tracing::info!(path = %found.display(), attempt, "Found converted EPUB3 by directory scan");
                return Some(found);
            }
        }

        tracing::warn!(expected = %expected.display(), "Converted EPUB3 not found");
        None
    }

    #[tracing::instrument(skip(self))]
    async fn locate_fix_outputs(&self, input: &Path, owned: &[PathBuf]) -> FixArtifacts {
        let dir = input.parent().unwrap_or_else(|| Path::new("."));
        let input_name = file_name(input);
        let stem = epub_stem(input_name);
        let fixed_expected = dir.join(format!("{}{}", stem, FIXED_SUFFIX));
        let report_expected = dir.join(format!("{}{}", stem, REPORT_SUFFIX));

        let mut artifacts = FixArtifacts::default();
        for attempt in 1..=self.attempts {
            self.settle().await;

            if artifacts.fixed.is_none() {
                let expected = std::slice::from_ref(&fixed_expected);
                artifacts.fixed = match first_existing(expected, input, owned).await {
                    Some(found) => Some(found),
                    None => scan_for_suffix(dir, FIXED_SUFFIX, input_name, input, owned).await,
                };
            }
            if artifacts.report.is_none() {
                let expected = std::slice::from_ref(&report_expected);
                artifacts.report = match first_existing(expected, input, owned).await {
                    Some(found) => Some(found),
                    None => scan_for_suffix(dir, REPORT_SUFFIX, input_name, input, owned).await,
                };
            }

            if artifacts.fixed.is_some() && artifacts.report.is_some() {
                break;
            }
            tracing::debug!(attempt, ?artifacts, "Fix outputs incomplete");
        }

        artifacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn locator() -> ConventionLocator {
        ConventionLocator::new(Duration::ZERO, 1)
    }

    #[tokio::test]
    async fn test_converted_found_at_expected_path() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("1-abc-book.epub");
        let expected = dir.path().join("1-abc-book_epub3.epub");
        std::fs::write(&input, b"in").unwrap();
        std::fs::write(&expected, b"out").unwrap();

        assert_eq!(
            locator().locate_converted(&input, &expected, &[]).await,
            Some(expected)
        );
    }

    #[tokio::test]
    async fn test_converted_found_by_scan() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("1-abc-book.epub");
        let expected = dir.path().join("elsewhere").join("1-abc-book_epub3.epub");
        let actual = dir.path().join("book_epub3.epub");
        std::fs::write(&input, b"in").unwrap();
        std::fs::write(&actual, b"out").unwrap();

        assert_eq!(
            locator().locate_converted(&input, &expected, &[]).await,
            Some(actual)
        );
    }

    #[tokio::test]
    async fn test_converted_missing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("1-abc-book.epub");
        std::fs::write(&input, b"in").unwrap();

        let found = locator()
            .locate_converted(&input, &dir.path().join("1-abc-book_epub3.epub"), &[])
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_fix_outputs_at_conventional_names() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("1-abc-book_epub3.epub");
        std::fs::write(dir.path().join("1-abc-book_epub3_fixed.epub"), b"f").unwrap();
        std::fs::write(dir.path().join("1-abc-book_epub3_report.html"), b"r").unwrap();

        let found = locator().locate_fix_outputs(&input, &[]).await;
        assert_eq!(found.fixed, Some(dir.path().join("1-abc-book_epub3_fixed.epub")));
        assert_eq!(found.report, Some(dir.path().join("1-abc-book_epub3_report.html")));
    }

    #[tokio::test]
    async fn test_fix_outputs_by_suffix_scan_ignores_unrelated_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("1-abc-book.epub");
        std::fs::write(dir.path().join("book_fixed.epub"), b"f").unwrap();
        std::fs::write(dir.path().join("other_report.html"), b"r").unwrap();

        let found = locator().locate_fix_outputs(&input, &[]).await;
        assert_eq!(found.fixed, Some(dir.path().join("book_fixed.epub")));
        assert_eq!(found.report, None);
    }

    #[tokio::test]
    async fn test_scan_never_returns_the_input() {
        let dir = tempdir().unwrap();
        // Upload names that already carry the tool's suffixes.
        let fixed_like = dir.path().join("1-abc-draft_fixed.epub");
        let epub3_like = dir.path().join("1-abc-draft_epub3.epub");
        std::fs::write(&fixed_like, b"in").unwrap();
        std::fs::write(&epub3_like, b"in").unwrap();

        let found = locator().locate_fix_outputs(&fixed_like, &[]).await;
        assert_eq!(found.fixed, None);

        let expected = dir.path().join("1-abc-draft_epub3_epub3.epub");
        let found = locator().locate_converted(&epub3_like, &expected, &[]).await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_scan_skips_owned_files() {
        let dir = tempdir().unwrap();
        let staged = dir.path().join("1-abc-draft_fixed.epub");
        let converted = dir.path().join("1-abc-draft_fixed_epub3.epub");
        std::fs::write(&staged, b"in").unwrap();
        std::fs::write(&converted, b"converted").unwrap();

        let found = locator()
            .locate_fix_outputs(&converted, std::slice::from_ref(&staged))
            .await;
        assert_eq!(found.fixed, None);
    }
}
