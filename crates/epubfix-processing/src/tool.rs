//! Adapter around the external `epub-fix` command-line tool.
//!
//! The tool is the only component that understands EPUB internals. It is
//! driven in four modes:
//!
//! - `--version`: capability probe
//! - `convert --dry-run <file>`: analysis, used for version detection
//! - `convert [--use-gemini] <file>`: EPUB 2 to EPUB 3 conversion
//! - `[--use-gemini] <file>`: accessibility and validation fixes
//!
//! Outputs are written next to the input by convention; locating them is the
//! job of [`crate::locator`].

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use epubfix_core::constants::GEMINI_API_KEY_ENV;
use epubfix_core::naming::{parse_tool_version, ToolVersion};
use epubfix_core::FixerToolConfig;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::error::ToolError;

/// Captured result of one tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout followed by stderr; the tool reports progress on either.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

#[async_trait]
pub trait FixerTool: Send + Sync {
    /// Installed tool version; [`ToolVersion::UNKNOWN`] when it cannot be determined.
    async fn version(&self) -> ToolVersion;

    /// Read-only analysis of `input`.
    async fn analyze(&self, input: &Path) -> Result<ToolOutput, ToolError>;

    /// Convert an EPUB 2 package at `input` to EPUB 3.
    async fn convert(&self, input: &Path) -> Result<ToolOutput, ToolError>;

    /// Apply fixes to the EPUB 3 package at `input`, producing a fixed copy and a report.
    async fn fix(&self, input: &Path) -> Result<ToolOutput, ToolError>;
}

/// [`FixerTool`] backed by the `epub-fix` binary
pub struct EpubFixCli {
    config: FixerToolConfig,
    version: OnceCell<ToolVersion>,
}

impl EpubFixCli {
    pub fn new(config: FixerToolConfig) -> anyhow::Result<Self> {
        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        if config
            .binary_path
            .chars()
            .any(|c| dangerous_chars.contains(&c))
        {
            return Err(anyhow::anyhow!(
                "Invalid EPUB_FIX_PATH: contains dangerous characters"
            ));
        }

        Ok(Self {
            config,
            version: OnceCell::new(),
        })
    }

    fn ai_flag(&self) -> Option<&'static str> {
        self.config.gemini_api_key.as_ref().map(|_| "--use-gemini")
    }

    fn input_arg(input: &Path) -> Result<&str, ToolError> {
        input
            .to_str()
            .ok_or_else(|| ToolError::InvalidPath(input.to_path_buf()))
    }

    /// Directory the tool runs in; a bare file name runs in the current directory.
    fn working_dir(input: &Path) -> Option<&Path> {
        input.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Run the tool with `args`; non-zero exit is reported as [`ToolError::Failed`].
    #[tracing::instrument(skip(self, cwd), fields(binary = %self.config.binary_path))]
    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<ToolOutput, ToolError> {
        let mut command = Command::new(&self.config.binary_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        if let Some(key) = &self.config.gemini_api_key {
            command.env(GEMINI_API_KEY_ENV, key);
        }

        let start = std::time::Instant::now();
        let output = tokio::time::timeout(self.config.timeout(), command.output())
            .await
            .map_err(|_| ToolError::TimedOut {
                binary: self.config.binary_path.clone(),
                secs: self.config.timeout_secs,
            })?
            .map_err(|source| ToolError::Spawn {
                binary: self.config.binary_path.clone(),
                source,
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            code = ?result.code,
            duration_ms = start.elapsed().as_millis() as u64,
            stdout = %result.stdout.trim(),
            "epub-fix finished"
        );

        if !output.status.success() {
            tracing::warn!(code = ?result.code, stderr = %result.stderr.trim(), "epub-fix failed");
            return Err(ToolError::Failed {
                binary: self.config.binary_path.clone(),
                code: result.code,
                output: result,
            });
        }

        if !result.stderr.trim().is_empty() {
            tracing::warn!(stderr = %result.stderr.trim(), "epub-fix wrote to stderr");
        }

        Ok(result)
    }

    async fn probe_version(&self) -> Result<ToolVersion, ToolError> {
        let output = self.run(&["--version"], None).await?;
        parse_tool_version(output.stdout.trim())
            .or_else(|| parse_tool_version(output.stderr.trim()))
            .ok_or_else(|| ToolError::Failed {
                binary: self.config.binary_path.clone(),
                code: output.code,
                output,
            })
    }
}

#[async_trait]
impl FixerTool for EpubFixCli {
    async fn version(&self) -> ToolVersion {
        // Only a successful probe is cached; a failed one is retried on the next upload.
        match self
            .version
            .get_or_try_init(|| self.probe_version())
            .await
        {
            Ok(version) => *version,
            Err(e) => {
                tracing::warn!(error = %e, "Could not determine epub-fix version");
                ToolVersion::UNKNOWN
            }
        }
    }

    async fn analyze(&self, input: &Path) -> Result<ToolOutput, ToolError> {
        let arg = Self::input_arg(input)?;
        self.run(&["convert", "--dry-run", arg], Self::working_dir(input))
            .await
    }

    async fn convert(&self, input: &Path) -> Result<ToolOutput, ToolError> {
        let arg = Self::input_arg(input)?;
        let mut args = vec!["convert"];
        args.extend(self.ai_flag());
        args.push(arg);
        self.run(&args, Self::working_dir(input)).await
    }

    async fn fix(&self, input: &Path) -> Result<ToolOutput, ToolError> {
        let arg = Self::input_arg(input)?;
        let mut args: Vec<&str> = self.ai_flag().into_iter().collect();
        args.push(arg);
        self.run(&args, Self::working_dir(input)).await
    }
}
