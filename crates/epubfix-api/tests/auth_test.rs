mod helpers;

use helpers::auth::{login_user, register_test_user};
use helpers::setup_test_app;
use serde_json::json;

#[tokio::test]
async fn test_signup_and_login() {
    let app = setup_test_app().await;
    let client = app.client();

    let user = register_test_user(client, Some("Reader@Example.com")).await;
    assert_eq!(user.email, "Reader@Example.com");
    assert!(!user.token.is_empty());

    // Emails are stored normalized, so login is case-insensitive
    let token = login_user(client, "reader@example.com", &user.password).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, None).await;

    let response = client
        .post("/api/auth/login")
        .json(&json!({ "email": user.email, "password": user.password }))
        .await;

    assert_eq!(response.status_code(), 200);
    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("auth-token="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = setup_test_app().await;
    let client = app.client();
    register_test_user(client, Some("twice@example.com")).await;

    let response = client
        .post("/api/auth/signup")
        .json(&json!({ "email": "TWICE@example.com", "password": "AnotherPassword1" }))
        .await;

    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_signup_rejects_short_password() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/auth/signup")
        .json(&json!({ "email": "short@example.com", "password": "short" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, None).await;

    let response = client
        .post("/api/auth/login")
        .json(&json!({ "email": user.email, "password": "not-the-password" }))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_session_accepts_bearer_and_cookie() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, None).await;

    let response = client
        .get("/api/auth/session")
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], user.user_id.to_string());
    assert_eq!(body["is_admin"], false);

    let response = client
        .get("/api/auth/session")
        .add_header("Cookie", format!("auth-token={}", user.token))
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_test_app().await;
    let client = app.client();

    for path in ["/api/epub/list", "/api/auth/session", "/api/admin/users"] {
        let response = client.get(path).await;
        assert_eq!(response.status_code(), 401, "{path} should require auth");
    }

    let response = client
        .get("/api/epub/list")
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = setup_test_app().await;

    let response = app.client().post("/api/auth/logout").await;

    assert_eq!(response.status_code(), 200);
    let cookie = response.header("set-cookie");
    assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
}
