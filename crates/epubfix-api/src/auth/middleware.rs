use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use epubfix_core::constants::AUTH_COOKIE_NAME;
use epubfix_core::AppError;

use crate::auth::models::AuthUser;
use crate::error::HttpAppError;
use crate::state::AuthState;

/// Session token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolve the caller from the request headers.
pub async fn authenticate(auth: &AuthState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = auth.jwt.verify(&token)?;

    // Deleted accounts must not keep working until their token expires.
    let user = auth
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(AuthUser {
        user_id: user.id,
        is_admin: auth.is_admin(&user.email),
        email: user.email,
        name: user.name,
    })
}

pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth_state, request.headers()).await {
        Ok(user) => {
            tracing::debug!(user_id = %user.user_id, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
