//! EPUB version detection.
//!
//! The tool has no structured output, so detection is substring matching on
//! its analysis text. All of that matching lives in
//! [`classify_detection_output`]; swapping in a structured contract only
//! means replacing that function.

use std::path::Path;

use epubfix_core::EpubVersion;

use crate::tool::FixerTool;

const EPUB2_MARKERS: &[&str] = &[
    "EPUB version detected: 2.0",
    "Converting EPUB 2.0 to EPUB 3.0",
];

const EPUB3_MARKERS: &[&str] = &["EPUB version detected: 3.0", "Converting EPUB 3.0"];

/// Classify the analysis output. `None` when no known marker is present.
pub fn classify_detection_output(output: &str) -> Option<EpubVersion> {
    if EPUB2_MARKERS.iter().any(|m| output.contains(m)) {
        Some(EpubVersion::Epub2)
    } else if EPUB3_MARKERS.iter().any(|m| output.contains(m)) {
        Some(EpubVersion::Epub3)
    } else {
        None
    }
}

/// Detect the package version of `input`.
///
/// Ambiguous output and invocation errors both resolve to EPUB 3, which skips
/// conversion. Output captured from a non-zero exit is still classified.
#[tracing::instrument(skip(tool))]
pub async fn detect_version(tool: &dyn FixerTool, input: &Path) -> EpubVersion {
    let output = match tool.analyze(input).await {
        Ok(output) => output,
        Err(e) => match e.output() {
            Some(output) => output.clone(),
            None => {
                tracing::warn!(error = %e, "Version detection failed, assuming EPUB 3");
                return EpubVersion::Epub3;
            }
        },
    };

    match classify_detection_output(&output.combined()) {
        Some(version) => {
            tracing::info!(%version, "Detected EPUB version");
            version
        }
        None => {
            tracing::warn!("Could not determine EPUB version from output, assuming EPUB 3");
            EpubVersion::Epub3
        }
    }
}
