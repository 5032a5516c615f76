use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

/// Test user data
pub struct TestUser {
    pub email: String,
    pub password: String,
    pub user_id: Uuid,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Sign up through the API and log in.
pub async fn register_test_user(client: &TestServer, email: Option<&str>) -> TestUser {
    let email = email.unwrap_or("reader@example.com").to_string();
    let password = "TestPassword123!".to_string();

    let signup = client
        .post("/api/auth/signup")
        .json(&json!({ "email": email, "password": password, "name": "Test Reader" }))
        .await;
    assert_eq!(signup.status_code(), 201, "signup failed: {}", signup.text());
    let user: serde_json::Value = signup.json();
    let user_id = user["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("signup response carries the user id");

    let token = login_user(client, &email, &password).await;

    TestUser {
        email,
        password,
        user_id,
        token,
    }
}

/// Login and get a token
pub async fn login_user(client: &TestServer, email: &str, password: &str) -> String {
    let response = client
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200, "login failed: {}", response.text());

    let body: serde_json::Value = response.json();
    body["token"]
        .as_str()
        .expect("login response carries a token")
        .to_string()
}
