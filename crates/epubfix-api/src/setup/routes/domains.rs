//! Domain route groups.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

/// Public: signup, login and logout. `session` authenticates by itself.
pub fn auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/session", get(handlers::auth::session))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .with_state(state)
}

pub fn epub_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/epub/process", post(handlers::epub_process::process_epub))
        .route("/api/epub/list", get(handlers::epub_list::list_epubs))
        .route("/api/epub/download", get(handlers::epub_download::download_file))
        .route("/api/epub/delete", delete(handlers::epub_delete::delete_epub))
        .with_state(state)
}

pub fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(handlers::admin::list_users))
        .route("/api/admin/epubs", get(handlers::admin::list_epubs))
        .with_state(state)
}
