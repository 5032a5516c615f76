//! Application state and sub-state extractors.
//!
//! Handlers extract only the slice they need through Axum's `FromRef`.

use std::sync::Arc;

use anyhow::Context;
use epubfix_core::Config;
use epubfix_db::{UploadStore, UserStore};
use epubfix_processing::{ArtifactLocator, FixerTool, UploadOrchestrator};
use epubfix_storage::Workspace;

use crate::auth::jwt::JwtService;

/// Server-side upload limits.
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
}

/// Everything the epub handlers touch.
#[derive(Clone)]
pub struct EpubState {
    pub uploads: Arc<dyn UploadStore>,
    pub workspace: Workspace,
    pub orchestrator: Arc<UploadOrchestrator>,
    pub limits: UploadLimits,
}

/// Identity: user store, token service and the admin designation.
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtService,
    pub admin_email: Option<String>,
    /// Adds `Secure` to the session cookie.
    pub secure_cookies: bool,
}

impl AuthState {
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

pub struct AppState {
    pub config: Config,
    pub epub: EpubState,
    pub auth: AuthState,
}

impl AppState {
    /// Wire the stores, the fixer tool and the artifact locator into one state.
    pub async fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        uploads: Arc<dyn UploadStore>,
        tool: Arc<dyn FixerTool>,
        locator: Arc<dyn ArtifactLocator>,
    ) -> anyhow::Result<Self> {
        let workspace = Workspace::new(config.work_dir())
            .await
            .with_context(|| format!("Failed to prepare work dir {}", config.work_dir().display()))?;

        let orchestrator = UploadOrchestrator::new(
            workspace.clone(),
            tool,
            locator,
            uploads.clone(),
            &config.fixer().min_version,
        )?;

        let jwt = JwtService::new(config.jwt_secret(), config.jwt_expiry_hours());

        Ok(Self {
            epub: EpubState {
                uploads,
                workspace,
                orchestrator: Arc::new(orchestrator),
                limits: UploadLimits {
                    max_file_size: config.max_upload_size_bytes(),
                    allowed_extensions: config.allowed_extensions().to_vec(),
                },
            },
            auth: AuthState {
                users,
                jwt,
                admin_email: config.admin_email().map(str::to_string),
                secure_cookies: config.is_production(),
            },
            config,
        })
    }
}

impl axum::extract::FromRef<Arc<AppState>> for EpubState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.epub.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for AuthState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}
