//! Configuration module
//!
//! Configuration is read from the environment (optionally seeded from a `.env`
//! file) into [`Config`], which the API, the fixer tool adapter and the CLI all
//! share. `Config::from_env` validates before returning, so a `Config` in hand
//! is always usable.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const REQUEST_TIMEOUT_SECS: u64 = 600;

const MAX_UPLOAD_SIZE_MB: usize = 100;
const EPUB_FIX_PATH: &str = "epub-fix";
const EPUB_FIX_MIN_VERSION: &str = "1.1";
const EPUB_FIX_TIMEOUT_SECS: u64 = 300;
const ARTIFACT_SETTLE_MS: u64 = 500;
const ARTIFACT_PROBE_ATTEMPTS: u32 = 3;

/// Server-wide settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub request_timeout_secs: u64,
    pub environment: String,
}

/// How the external `epub-fix` binary is invoked and how its outputs are awaited
#[derive(Clone, Debug)]
pub struct FixerToolConfig {
    pub binary_path: String,
    pub min_version: String,
    pub timeout_secs: u64,
    /// Exported as `GEMINI_API_KEY`; when set the tool also gets `--use-gemini`.
    pub gemini_api_key: Option<String>,
    pub artifact_settle_ms: u64,
    pub artifact_probe_attempts: u32,
}

impl FixerToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn artifact_settle_delay(&self) -> Duration {
        Duration::from_millis(self.artifact_settle_ms)
    }
}

impl Default for FixerToolConfig {
    fn default() -> Self {
        Self {
            binary_path: EPUB_FIX_PATH.to_string(),
            min_version: EPUB_FIX_MIN_VERSION.to_string(),
            timeout_secs: EPUB_FIX_TIMEOUT_SECS,
            gemini_api_key: None,
            artifact_settle_ms: ARTIFACT_SETTLE_MS,
            artifact_probe_attempts: ARTIFACT_PROBE_ATTEMPTS,
        }
    }
}

/// Full application configuration
#[derive(Clone, Debug)]
pub struct EpubFixConfig {
    pub base: BaseConfig,
    pub database_url: String,
    /// The account with this email is treated as an administrator.
    pub admin_email: Option<String>,
    /// Root under which `uploads/` and `processed/` live.
    pub work_dir: PathBuf,
    pub max_upload_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub fixer: FixerToolConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<EpubFixConfig>);

impl Config {
    fn inner(&self) -> &EpubFixConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = EpubFixConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.inner().base.request_timeout_secs
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn admin_email(&self) -> Option<&str> {
        self.inner().admin_email.as_deref()
    }

    /// Whether `email` belongs to the configured administrator (case-insensitive).
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email()
            .map(|admin| admin.eq_ignore_ascii_case(email.trim()))
            .unwrap_or(false)
    }

    pub fn work_dir(&self) -> &Path {
        &self.inner().work_dir
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.inner().allowed_extensions
    }

    pub fn fixer(&self) -> &FixerToolConfig {
        &self.inner().fixer
    }
}

impl EpubFixConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "epub".to_string())
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .or_else(|_| env::var("AUTH_SECRET"))
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| REQUEST_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            environment,
        };

        let fixer = FixerToolConfig {
            binary_path: env::var("EPUB_FIX_PATH").unwrap_or_else(|_| EPUB_FIX_PATH.to_string()),
            min_version: env::var("EPUB_FIX_MIN_VERSION")
                .unwrap_or_else(|_| EPUB_FIX_MIN_VERSION.to_string()),
            timeout_secs: env::var("EPUB_FIX_TIMEOUT_SECS")
                .unwrap_or_else(|_| EPUB_FIX_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(EPUB_FIX_TIMEOUT_SECS),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
            artifact_settle_ms: env::var("ARTIFACT_SETTLE_MS")
                .unwrap_or_else(|_| ARTIFACT_SETTLE_MS.to_string())
                .parse()
                .unwrap_or(ARTIFACT_SETTLE_MS),
            artifact_probe_attempts: env::var("ARTIFACT_PROBE_ATTEMPTS")
                .unwrap_or_else(|_| ARTIFACT_PROBE_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(ARTIFACT_PROBE_ATTEMPTS),
        };

        let config = EpubFixConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            work_dir: env::var("APP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_extensions,
            fixer,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.fixer.binary_path.trim().is_empty() {
            return Err(anyhow::anyhow!("EPUB_FIX_PATH cannot be empty"));
        }

        if crate::naming::parse_tool_version(&self.fixer.min_version).is_none() {
            return Err(anyhow::anyhow!(
                "EPUB_FIX_MIN_VERSION must look like MAJOR.MINOR (got '{}')",
                self.fixer.min_version
            ));
        }

        if self.fixer.timeout_secs == 0 {
            return Err(anyhow::anyhow!("EPUB_FIX_TIMEOUT_SECS must be greater than 0"));
        }

        if self.base.request_timeout_secs <= self.fixer.timeout_secs {
            return Err(anyhow::anyhow!(
                "REQUEST_TIMEOUT_SECS ({}) must exceed EPUB_FIX_TIMEOUT_SECS ({})",
                self.base.request_timeout_secs,
                self.fixer.timeout_secs
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS cannot be empty"));
        }

        Ok(())
    }
}
