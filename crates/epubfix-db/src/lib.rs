//! EpubFix Database Layer
//!
//! Store traits for users and upload records, their PostgreSQL repositories,
//! and (behind the `memory` feature) in-memory stores for tests.

pub mod db;

pub use db::{UploadRepository, UploadStore, UserRepository, UserStore};

#[cfg(any(test, feature = "memory"))]
pub use db::memory::MemoryStore;
