//! Data models for the application

mod upload;
mod user;

pub use upload::*;
pub use user::*;
