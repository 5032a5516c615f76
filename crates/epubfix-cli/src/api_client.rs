//! Minimal HTTP client for the EpubFix API.

use anyhow::{Context, Result};
use epubfix_core::models::UploadRecordResponse;
use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Deserialize)]
struct UploadListResponse {
    data: Vec<UploadRecordResponse>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Caller's uploads, newest first.
    pub async fn list_uploads(&self) -> Result<Vec<UploadRecordResponse>> {
        let response = self
            .http
            .get(self.url("/api/epub/list"))
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            anyhow::bail!("API returned {}: {}", status, message);
        }

        let body: UploadListResponse = response
            .json()
            .await
            .context("Failed to parse upload list")?;
        Ok(body.data)
    }
}
