//! EpubFix Storage Library
//!
//! The on-disk working area shared by the upload pipeline and the download
//! endpoint.
//!
//! # Layout
//!
//! Everything lives under one work directory:
//!
//! - `uploads/<file_id>-<name>`: staged inputs and EPUB3 conversions
//! - `processed/<file_id>/fixed-<name>` and `processed/<file_id>/report-<name>.html`:
//!   finalized artifacts
//!
//! Keys are paths relative to the work directory. They must not contain `..`,
//! must not be absolute and must start with one of the two roots above.

pub mod error;
pub mod keys;
pub mod workspace;

pub use error::{StorageError, StorageResult};
pub use keys::{content_type_for, generate_file_id, key_from_url, url_for_key, ArtifactRoot};
pub use workspace::{ResolvedFile, StagedFile, Workspace};
