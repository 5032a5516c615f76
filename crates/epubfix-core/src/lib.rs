//! EpubFix Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every EpubFix component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod naming;

// Re-export commonly used types
pub use config::{BaseConfig, Config, EpubFixConfig, FixerToolConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{EpubVersion, UploadRecord, UploadStatus, User};
