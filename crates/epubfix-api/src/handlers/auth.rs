//! Signup, login, session and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use epubfix_core::constants::AUTH_COOKIE_NAME;
use epubfix_core::models::{NewUser, UserResponse};
use epubfix_core::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::middleware::authenticate;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AuthState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "Ada Lovelace")]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        AUTH_COOKIE_NAME, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn signup(
    State(auth): State<AuthState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let email = normalize_email(&request.email);
    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let user = auth
        .users
        .create(NewUser {
            password_hash: hash_password(&request.password)?,
            email,
            name,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User signed up");

    let is_admin = auth.is_admin(&user.email);
    Ok((StatusCode::CREATED, Json(UserResponse::from_user(user, is_admin))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; the token is also set as the auth-token cookie", body = LoginResponse),
        (status = 400, description = "Account has no password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(auth): State<AuthState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = auth
        .users
        .find_by_email(&normalize_email(&request.email))
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.as_deref().ok_or_else(|| {
        AppError::BadRequest("This account has no password set".to_string())
    })?;

    if !verify_password(&request.password, hash)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(invalid().into());
    }

    let is_admin = auth.is_admin(&user.email);
    let token = auth.jwt.issue(&user, is_admin)?;

    let cookie = session_cookie(&token, auth.jwt.expiry_secs(), auth.secure_cookies);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("Invalid cookie value: {}", e)))?,
    );

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        headers,
        Json(LoginResponse {
            token,
            user: UserResponse::from_user(user, is_admin),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn session(
    State(auth): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, HttpAppError> {
    let caller = authenticate(&auth, &headers).await?;

    let user = auth
        .users
        .find_by_id(caller.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(UserResponse::from_user(user, caller.is_admin)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = LogoutResponse)
    )
)]
pub async fn logout(State(auth): State<AuthState>) -> impl IntoResponse {
    let cookie = session_cookie("", 0, auth.secure_cookies);
    (
        [(header::SET_COOKIE, cookie)],
        Json(LogoutResponse { success: true }),
    )
}
