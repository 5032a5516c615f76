//! EpubFix processing
//!
//! Everything between a staged upload and a persisted record: the adapter
//! around the external `epub-fix` binary, classification of its analysis
//! output, discovery of the files it writes, report handling and the
//! orchestrator that ties those steps together.

pub mod detection;
pub mod error;
pub mod locator;
pub mod pipeline;
pub mod report;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use detection::{classify_detection_output, detect_version};
pub use error::ToolError;
pub use locator::{ArtifactLocator, ConventionLocator, FixArtifacts};
pub use pipeline::{ProcessedUpload, UploadOrchestrator, UploadRequest};
pub use report::{placeholder_report, rewrite_report_links};
pub use tool::{EpubFixCli, FixerTool, ToolOutput};
