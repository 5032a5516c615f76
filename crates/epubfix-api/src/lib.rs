//! EpubFix API Library
//!
//! HTTP handlers, authentication, middleware and application setup.

mod api_doc;
mod handlers;
mod middleware;
mod utils;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
