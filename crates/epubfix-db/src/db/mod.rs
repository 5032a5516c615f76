//! Database repositories for the data access layer
//!
//! Handlers depend on the [`UploadStore`] and [`UserStore`] traits; the
//! PostgreSQL repositories are the production implementations.

mod store;
mod upload;
mod user;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use store::{UploadStore, UserStore};
pub use upload::UploadRepository;
pub use user::UserRepository;
