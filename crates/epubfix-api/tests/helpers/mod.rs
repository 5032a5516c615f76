pub mod auth;
pub mod fixtures;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use epubfix_api::setup::routes::setup_routes;
use epubfix_api::AppState;
use epubfix_core::config::{BaseConfig, EpubFixConfig, FixerToolConfig};
use epubfix_core::Config;
use epubfix_db::MemoryStore;
use epubfix_processing::testing::{Script, ScriptedTool};
use epubfix_processing::ConventionLocator;
use tempfile::TempDir;

pub const TEST_ADMIN_EMAIL: &str = "admin@example.com";

/// Test application backed by in-memory stores and a scripted fixer tool
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub tool: Arc<ScriptedTool>,
    pub work_dir: TempDir,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Absolute path of a key under the work directory
    pub fn path(&self, key: &str) -> PathBuf {
        self.work_dir.path().join(key.trim_start_matches('/'))
    }

    /// Regular files currently under `dir` (`uploads` or `processed`), recursively
    pub fn files_under(&self, dir: &str) -> Vec<PathBuf> {
        fn walk(dir: &std::path::Path, out: &mut Vec<PathBuf>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(&path, out);
                } else {
                    out.push(path);
                }
            }
        }

        let mut files = Vec::new();
        walk(&self.work_dir.path().join(dir), &mut files);
        files
    }
}

pub fn test_config(work_dir: PathBuf) -> Config {
    test_config_with_timeout(work_dir, 30)
}

pub fn test_config_with_timeout(work_dir: PathBuf, request_timeout_secs: u64) -> Config {
    Config(Box::new(EpubFixConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            jwt_secret: "test-jwt-secret-at-least-32-characters-long".to_string(),
            jwt_expiry_hours: 1,
            request_timeout_secs,
            environment: "test".to_string(),
        },
        database_url: "postgres://unused".to_string(),
        admin_email: Some(TEST_ADMIN_EMAIL.to_string()),
        work_dir,
        max_upload_size_bytes: 1024 * 1024,
        allowed_extensions: vec!["epub".to_string()],
        fixer: FixerToolConfig {
            artifact_settle_ms: 0,
            artifact_probe_attempts: 1,
            ..FixerToolConfig::default()
        },
    }))
}

/// Setup a test application with its own work directory
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Script::default()).await
}

pub async fn setup_test_app_with(script: Script) -> TestApp {
    setup_test_app_with_timeout(script, 30).await
}

/// Setup a test application whose requests are cut off after `request_timeout_secs`
pub async fn setup_test_app_with_timeout(script: Script, request_timeout_secs: u64) -> TestApp {
    let work_dir = TempDir::new().expect("Failed to create temp work dir");
    let config = test_config_with_timeout(work_dir.path().to_path_buf(), request_timeout_secs);

    let store = Arc::new(MemoryStore::new());
    let tool = Arc::new(ScriptedTool::new(script));
    let locator = Arc::new(ConventionLocator::new(Duration::ZERO, 1));

    let state = AppState::new(
        config.clone(),
        store.clone(),
        store.clone(),
        tool.clone(),
        locator,
    )
    .await
    .expect("Failed to build app state");

    let router = setup_routes(&config, Arc::new(state)).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        store,
        tool,
        work_dir,
    }
}
